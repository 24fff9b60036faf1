//! Per-symbol pipeline: fetch, smooth, detect, signal, simulate, assemble.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backtest::{BacktestConfig, simulate};
use super::error::EngineError;
use super::fibonacci::{CycleHistory, SwingConfig, estimate_cycle};
use super::heikin_ashi::{self, SmoothedBar};
use super::market_data::MarketData;
use super::ohlcv::Bar;
use super::report::AnalysisReport;
use super::scan::ScanConfig;
use super::signal::{SignalConfig, evaluate_history, evaluate_latest};
use super::source::Source;

/// Every tunable of the pipeline, passed explicitly into each stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Calendar days of history behind a signal check.
    pub lookback_days: i64,
    pub swing: SwingConfig,
    pub signal: SignalConfig,
    pub backtest: BacktestConfig,
    pub scan: ScanConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            lookback_days: 365,
            swing: SwingConfig::default(),
            signal: SignalConfig::default(),
            backtest: BacktestConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub source: Source,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn smooth_checked(
    symbol: &str,
    bars: &[Bar],
    swing: &SwingConfig,
) -> Result<Vec<SmoothedBar>, EngineError> {
    let minimum = swing.min_bars();
    if bars.len() < minimum {
        return Err(EngineError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum,
        });
    }
    heikin_ashi::transform(bars)
}

pub fn run(
    data: &MarketData,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, EngineError> {
    let symbol = request.symbol.as_str();
    let bars = data.fetch(symbol, request.start, request.end, request.source)?;
    let smoothed = smooth_checked(symbol, &bars, &config.swing)?;

    let cycle = CycleHistory::build(&smoothed, &config.swing);
    let last = smoothed.len() - 1;
    let swings = cycle.swings_as_of(last).to_vec();
    let levels = cycle.levels_as_of(last).to_vec();
    debug!(symbol, swings = swings.len(), fans = cycle.fans().len(), "cycle detected");

    let buy_signal = evaluate_latest(&smoothed, &cycle, &config.signal);
    let events = evaluate_history(&smoothed, &bars, &cycle, &config.signal);
    debug!(symbol, events = events.len(), buy_signal, "signals evaluated");

    let result = simulate(&bars, &events, request.source, &config.backtest)?;
    let cycle_estimate = estimate_cycle(&swings, last);

    Ok(AnalysisReport {
        request: request.clone(),
        bars,
        smoothed,
        cycle,
        swings,
        levels,
        events,
        result,
        buy_signal,
        cycle_estimate,
    })
}

/// First day of the `lookback_days` window that ends at `as_of`.
pub fn lookback_start(as_of: NaiveDate, lookback_days: i64) -> Result<NaiveDate, EngineError> {
    Duration::try_days(lookback_days)
        .and_then(|span| as_of.checked_sub_signed(span))
        .ok_or_else(|| {
            EngineError::invalid(
                "analysis",
                "lookback_days",
                format!("{lookback_days} days before {as_of} is out of range"),
            )
        })
}

/// Buy signal for the bar at or before `as_of`, from `lookback_days` of history.
pub fn check_buy_signal(
    data: &MarketData,
    symbol: &str,
    source: Source,
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> Result<bool, EngineError> {
    let start = lookback_start(as_of, config.lookback_days)?;
    let bars = data.fetch(symbol, start, as_of, source)?;
    let smoothed = smooth_checked(symbol, &bars, &config.swing)?;
    let cycle = CycleHistory::build(&smoothed, &config.swing);
    let signal = evaluate_latest(&smoothed, &cycle, &config.signal);
    debug!(symbol, %as_of, signal, "buy signal checked");
    Ok(signal)
}
