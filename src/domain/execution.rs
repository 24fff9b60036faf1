//! Fill simulation: slippage on both sides and percentage commission.

use super::backtest::BacktestConfig;

/// Long entry (buy): execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_long_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Long exit (sell): execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_long_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

pub fn entry_fill(price: f64, config: &BacktestConfig) -> f64 {
    apply_slippage_long_entry(price, config.slippage_pct)
}

pub fn exit_fill(price: f64, config: &BacktestConfig) -> f64 {
    apply_slippage_long_exit(price, config.slippage_pct)
}

/// Net return of a round trip with commission charged on both legs:
/// exit_fill * (1 - c/100) / (entry_fill * (1 + c/100)) - 1
pub fn round_trip_return(entry_fill: f64, exit_fill: f64, config: &BacktestConfig) -> f64 {
    let c = config.commission_pct / 100.0;
    let cost = entry_fill * (1.0 + c);
    if cost <= 0.0 {
        return 0.0;
    }
    exit_fill * (1.0 - c) / cost - 1.0
}
