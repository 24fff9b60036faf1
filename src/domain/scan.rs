//! Batch buy-signal scan over many symbols.
//!
//! Each symbol runs [`check_buy_signal`] on the blocking pool, gated by a
//! semaphore and bounded by a per-symbol timeout. A symbol that fails or times
//! out is recorded in [`ScanReport::failures`] and never stops the others.
//! [`detail_signals`] then runs the full pipeline for each symbol that signalled.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::analysis::{
    self, AnalysisConfig, AnalysisRequest, check_buy_signal, lookback_start,
};
use crate::domain::error::EngineError;
use crate::domain::market_data::MarketData;
use crate::domain::report::AnalysisReport;
use crate::domain::source::Source;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: EngineError,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Symbols with a buy signal, in input order.
    pub signals: Vec<String>,
    pub failures: Vec<ScanFailure>,
    /// Symbols evaluated without error, signal or not.
    pub evaluated: usize,
}

/// Full analyses of the symbols a scan flagged.
#[derive(Debug, Default)]
pub struct DetailReport {
    pub reports: Vec<AnalysisReport>,
    pub failures: Vec<ScanFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeListError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeListError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CodeListError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(CodeListError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

async fn check_one(
    data: Arc<MarketData>,
    symbol: String,
    source: Source,
    as_of: NaiveDate,
    config: Arc<AnalysisConfig>,
    semaphore: Arc<Semaphore>,
) -> Result<bool, EngineError> {
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| EngineError::Analysis {
            reason: format!("scan semaphore closed: {e}"),
        })?;
    let timeout = config.scan.timeout;

    let task_symbol = symbol.clone();
    let job = tokio::task::spawn_blocking(move || {
        // held until the check returns, even after a timeout
        let _permit = permit;
        check_buy_signal(&data, &task_symbol, source, as_of, &config)
    });

    match tokio::time::timeout(timeout, job).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(EngineError::Analysis {
            reason: format!("worker for {symbol} failed: {join_err}"),
        }),
        Err(_) => Err(EngineError::Timeout {
            symbol,
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Scan from inside an existing tokio runtime.
pub async fn scan_symbols_async(
    data: Arc<MarketData>,
    symbols: &[String],
    source: Source,
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> ScanReport {
    let config = Arc::new(config.clone());
    let semaphore = Arc::new(Semaphore::new(config.scan.concurrency.max(1)));
    info!(
        symbols = symbols.len(),
        concurrency = config.scan.concurrency,
        %source,
        "scan started"
    );

    let handles: Vec<_> = symbols
        .iter()
        .map(|symbol| {
            tokio::spawn(check_one(
                Arc::clone(&data),
                symbol.clone(),
                source,
                as_of,
                Arc::clone(&config),
                Arc::clone(&semaphore),
            ))
        })
        .collect();

    let mut report = ScanReport::default();
    for (symbol, handle) in symbols.iter().zip(handles) {
        let outcome = handle.await.unwrap_or_else(|e| {
            Err(EngineError::Analysis {
                reason: format!("scan task for {symbol} failed: {e}"),
            })
        });
        match outcome {
            Ok(signal) => {
                debug!(symbol = %symbol, signal, "symbol checked");
                report.evaluated += 1;
                if signal {
                    report.signals.push(symbol.clone());
                }
            }
            Err(error) => {
                warn!(symbol = %symbol, kind = %error.kind(), "skipping symbol: {error}");
                report.failures.push(ScanFailure {
                    symbol: symbol.clone(),
                    error,
                });
            }
        }
    }

    info!(
        evaluated = report.evaluated,
        signals = report.signals.len(),
        failures = report.failures.len(),
        "scan complete"
    );
    report
}

/// Scan on a private runtime. Timed-out checks are abandoned, not joined.
pub fn scan_symbols(
    data: Arc<MarketData>,
    symbols: &[String],
    source: Source,
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> Result<ScanReport, EngineError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.scan.concurrency.clamp(1, 8))
        .enable_time()
        .build()?;
    let report = runtime.block_on(scan_symbols_async(data, symbols, source, as_of, config));
    runtime.shutdown_background();
    Ok(report)
}

/// Backtest each symbol over the `lookback_days` window ending at `as_of`.
/// One symbol failing is recorded and the rest still run.
pub fn detail_signals(
    data: &MarketData,
    symbols: &[String],
    source: Source,
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> DetailReport {
    let mut detail = DetailReport::default();
    for symbol in symbols {
        let outcome = lookback_start(as_of, config.lookback_days).and_then(|start| {
            let request = AnalysisRequest {
                symbol: symbol.clone(),
                source,
                start,
                end: as_of,
            };
            analysis::run(data, &request, config)
        });
        match outcome {
            Ok(report) => {
                debug!(symbol = %symbol, trades = report.result.trades.len(), "detail analyzed");
                detail.reports.push(report);
            }
            Err(error) => {
                warn!(symbol = %symbol, kind = %error.kind(), "detail failed: {error}");
                detail.failures.push(ScanFailure {
                    symbol: symbol.clone(),
                    error,
                });
            }
        }
    }
    detail
}
