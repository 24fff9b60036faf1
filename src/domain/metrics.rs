//! Performance metrics over a unit-start equity curve and closed trades.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::position::ClosedTrade;
use super::source::Source;

/// Equity value at bar close; curves start from 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

pub const INITIAL_EQUITY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline as a non-positive fraction.
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub avg_trade_return: f64,
    pub avg_holding_days: f64,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[ClosedTrade], source: Source) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(INITIAL_EQUITY);
        let total_return = final_equity / INITIAL_EQUITY - 1.0;

        let years = elapsed_years(equity_curve, source);
        let annualized_return = if years > 0.0 && total_return.is_finite() {
            (1.0 + total_return).max(0.0).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let total_trades = returns.len();
        let sharpe_ratio = compute_sharpe(&returns, years);

        let (win_rate, avg_trade_return, avg_holding_days) = if total_trades > 0 {
            let n = total_trades as f64;
            let wins = trades.iter().filter(|t| t.is_win()).count() as f64;
            let days: i64 = trades.iter().map(ClosedTrade::holding_days).sum();
            (wins / n, returns.iter().sum::<f64>() / n, days as f64 / n)
        } else {
            (0.0, 0.0, 0.0)
        };

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown: compute_drawdown(equity_curve),
            total_trades,
            win_rate,
            avg_trade_return,
            avg_holding_days,
        }
    }
}

/// Years spanned by the curve: bar count over 252 for equities, calendar days
/// between the first and last bar over 365 for crypto.
pub fn elapsed_years(equity_curve: &[EquityPoint], source: Source) -> f64 {
    let periods = match source {
        Source::Equity => equity_curve.len() as f64,
        Source::Crypto => match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days() as f64,
            _ => 0.0,
        },
    };
    periods / source.periods_per_year()
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            max_dd = max_dd.min(point.equity / peak - 1.0);
        }
    }

    max_dd
}

/// Mean over sample deviation of per-trade returns, scaled by trades per year.
fn compute_sharpe(returns: &[f64], years: f64) -> f64 {
    if returns.len() < 2 || years <= 0.0 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * (n / years).sqrt()
    } else {
        0.0
    }
}
