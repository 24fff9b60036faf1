//! Configuration validation.
//!
//! Every key is optional; a present key must parse and be in range. Runs
//! before any analysis so bad values surface as `ConfigInvalid` instead of a
//! silently defaulted run.

use std::str::FromStr;

use crate::domain::error::EngineError;
use crate::domain::fibonacci::is_fib_ratio;
use crate::domain::resample::CandleInterval;
use crate::ports::config_port::ConfigPort;

/// Where bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProvider {
    /// Yahoo chart API for equities, Upbit for crypto.
    Http,
    /// `{csv_dir}/{symbol}.csv` files.
    Csv,
}

impl FromStr for DataProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(DataProvider::Http),
            "csv" => Ok(DataProvider::Csv),
            other => Err(format!("unknown provider '{other}' (expected http or csv)")),
        }
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), EngineError> {
    validate_lookback(config)?;
    validate_swing(config)?;
    validate_signal(config)?;
    validate_backtest(config)?;
    validate_scan(config)?;
    validate_data(config)?;
    Ok(())
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, EngineError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| EngineError::invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

fn check_flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), EngineError> {
    match config.get_string(section, key) {
        Some(raw) if parse_bool(&raw).is_none() => Err(EngineError::invalid(
            section,
            key,
            format!("'{raw}' is not a boolean"),
        )),
        _ => Ok(()),
    }
}

fn at_least_one(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), EngineError> {
    if let Some(value) = parse_value::<i64>(config, section, key)? {
        if value < 1 {
            return Err(EngineError::invalid(section, key, format!("{key} must be at least 1")));
        }
    }
    Ok(())
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), EngineError> {
    if let Some(value) = parse_value::<f64>(config, section, key)? {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::invalid(section, key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

/// A century of daily history.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), EngineError> {
    at_least_one(config, "analysis", "lookback_days")?;
    if let Some(days) = parse_value::<i64>(config, "analysis", "lookback_days")? {
        if days > MAX_LOOKBACK_DAYS {
            return Err(EngineError::invalid(
                "analysis",
                "lookback_days",
                format!("lookback_days must be at most {MAX_LOOKBACK_DAYS}"),
            ));
        }
    }
    Ok(())
}

fn validate_swing(config: &dyn ConfigPort) -> Result<(), EngineError> {
    at_least_one(config, "swing", "half_width")
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(ratio) = parse_value::<f64>(config, "signal", "trigger_ratio")? {
        if !is_fib_ratio(ratio) {
            return Err(EngineError::invalid(
                "signal",
                "trigger_ratio",
                format!("{ratio} is not a Fibonacci ratio"),
            ));
        }
    }
    at_least_one(config, "signal", "lookback_bars")?;
    at_least_one(config, "signal", "exit_bearish_bars")?;
    check_flag(config, "signal", "require_bullish")?;
    check_flag(config, "signal", "exit_on_level_break")?;
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), EngineError> {
    non_negative(config, "backtest", "commission_pct")?;
    non_negative(config, "backtest", "slippage_pct")?;
    if let Some(slippage) = parse_value::<f64>(config, "backtest", "slippage_pct")? {
        if slippage >= 100.0 {
            return Err(EngineError::invalid(
                "backtest",
                "slippage_pct",
                "slippage_pct must be below 100",
            ));
        }
    }
    check_flag(config, "backtest", "mark_to_market")?;
    Ok(())
}

fn validate_scan(config: &dyn ConfigPort) -> Result<(), EngineError> {
    at_least_one(config, "scan", "concurrency")?;
    at_least_one(config, "scan", "timeout_ms")?;
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), EngineError> {
    if let Some(raw) = config.get_string("data", "provider") {
        raw.parse::<DataProvider>()
            .map_err(|reason| EngineError::invalid("data", "provider", reason))?;
    }
    if let Some(raw) = config.get_string("data", "crypto_interval") {
        raw.parse::<CandleInterval>()
            .map_err(|reason| EngineError::invalid("data", "crypto_interval", reason))?;
    }
    if let Some(dir) = config.get_string("data", "csv_dir") {
        if dir.trim().is_empty() {
            return Err(EngineError::invalid("data", "csv_dir", "csv_dir must not be empty"));
        }
    }
    Ok(())
}
