//! Bar source port.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

/// Daily bars for one symbol between two dates (both inclusive).
///
/// Implementations may return unsorted or duplicated bars; callers run the
/// result through [`crate::domain::ohlcv::normalize_bars`]. `Send + Sync` so
/// one client can serve concurrent scan workers.
pub trait DataPort: Send + Sync {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError>;
}
