//! Source-routed bar fetching.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use super::error::EngineError;
use super::ohlcv::{Bar, normalize_bars};
use super::source::Source;
use crate::ports::data_port::DataPort;

/// One [`DataPort`] per [`Source`]; the only place fetching branches on the
/// source tag.
#[derive(Clone)]
pub struct MarketData {
    equity: Arc<dyn DataPort>,
    crypto: Arc<dyn DataPort>,
}

impl MarketData {
    pub fn new(equity: Arc<dyn DataPort>, crypto: Arc<dyn DataPort>) -> Self {
        Self { equity, crypto }
    }

    /// Same port for both sources (offline CSV directories, tests).
    pub fn single(port: Arc<dyn DataPort>) -> Self {
        Self {
            equity: Arc::clone(&port),
            crypto: port,
        }
    }

    fn port(&self, source: Source) -> &dyn DataPort {
        match source {
            Source::Equity => self.equity.as_ref(),
            Source::Crypto => self.crypto.as_ref(),
        }
    }

    /// Normalized daily bars in `[start, end]`; never empty on success.
    pub fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        source: Source,
    ) -> Result<Vec<Bar>, EngineError> {
        if start > end {
            return Err(EngineError::data_unavailable(
                symbol,
                format!("start {start} is after end {end}"),
            ));
        }
        let raw = self.port(source).fetch_bars(symbol, start, end)?;
        let fetched = raw.len();
        let bars = normalize_bars(symbol, raw, start, end)?;
        debug!(symbol, %source, fetched, kept = bars.len(), "bars fetched");
        Ok(bars)
    }
}
