//! Long-only backtest over a signal event stream.
//!
//! The simulator is a FLAT/LONG state machine: the first ENTRY opens a
//! position, later ENTRY events while LONG are ignored, and an EXIT while FLAT
//! is ignored. Equity starts at 1.0 and compounds by each closed trade's net
//! return; a position still open at the last bar is not closed.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EngineError;
use super::execution::{entry_fill, exit_fill, round_trip_return};
use super::metrics::{EquityPoint, INITIAL_EQUITY, Metrics};
use super::ohlcv::Bar;
use super::position::{ClosedTrade, Position};
use super::signal::{SignalEvent, SignalKind};
use super::source::Source;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
    /// Value an open position at the bar close on the equity curve.
    pub mark_to_market: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
}

pub fn simulate(
    bars: &[Bar],
    events: &[SignalEvent],
    source: Source,
    config: &BacktestConfig,
) -> Result<BacktestResult, EngineError> {
    if bars.is_empty() {
        return Err(EngineError::Analysis {
            reason: "no data".into(),
        });
    }

    let index_of: HashMap<NaiveDate, usize> =
        bars.iter().enumerate().map(|(i, b)| (b.date, i)).collect();
    let mut at_bar: Vec<Vec<&SignalEvent>> = vec![Vec::new(); bars.len()];
    for event in events {
        match index_of.get(&event.date) {
            Some(&i) => at_bar[i].push(event),
            None => debug!(date = %event.date, "ignoring event without a matching bar"),
        }
    }

    let mut equity = INITIAL_EQUITY;
    let mut position: Option<Position> = None;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        for event in &at_bar[i] {
            match (event.kind, position.take()) {
                (SignalKind::Entry, None) => {
                    position = Some(Position {
                        entry_price: event.price,
                        entry_fill: entry_fill(event.price, config),
                        entry_date: bar.date,
                        entry_index: i,
                    });
                }
                (SignalKind::Entry, Some(open)) => {
                    debug!(date = %bar.date, "already long, ignoring entry");
                    position = Some(open);
                }
                (SignalKind::Exit, Some(open)) => {
                    let fill = exit_fill(event.price, config);
                    let r = round_trip_return(open.entry_fill, fill, config);
                    equity *= 1.0 + r;
                    trades.push(open.close(event.price, bar.date, i, r));
                }
                (SignalKind::Exit, None) => {
                    debug!(date = %bar.date, "flat, ignoring exit");
                }
            }
        }

        let marked = match &position {
            Some(open) if config.mark_to_market => equity * (1.0 + open.unrealized_return(bar.close)),
            _ => equity,
        };
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity: marked,
        });
    }

    let metrics = Metrics::compute(&equity_curve, &trades, source);
    debug!(
        trades = metrics.total_trades,
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        metrics,
        equity_curve,
        trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn event(bars: &[Bar], index: usize, kind: SignalKind) -> SignalEvent {
        SignalEvent {
            date: bars[index].date,
            index,
            kind,
            price: bars[index].close,
        }
    }

    #[test]
    fn two_round_trips_compound() {
        let bars = make_bars(&[100.0, 120.0, 120.0, 90.0]);
        let events = vec![
            event(&bars, 0, SignalKind::Entry),
            event(&bars, 1, SignalKind::Exit),
            event(&bars, 2, SignalKind::Entry),
            event(&bars, 3, SignalKind::Exit),
        ];
        let result = simulate(&bars, &events, Source::Equity, &BacktestConfig::default()).unwrap();

        assert_eq!(result.metrics.total_trades, 2);
        assert!((result.trades[0].return_pct - 0.2).abs() < 1e-12);
        assert!((result.trades[1].return_pct + 0.25).abs() < 1e-12);
        assert!((result.metrics.total_return + 0.10).abs() < 1e-12);
        // peak 1.2, trough 0.9
        assert!((result.metrics.max_drawdown + 0.25).abs() < 1e-12);
    }

    #[test]
    fn equity_curve_has_one_point_per_bar() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let result = simulate(&bars, &[], Source::Equity, &BacktestConfig::default()).unwrap();

        assert_eq!(result.equity_curve.len(), bars.len());
        assert!(result.equity_curve.iter().all(|p| p.equity == 1.0));
        assert_eq!(result.metrics.total_trades, 0);
        assert_eq!(result.metrics.max_drawdown, 0.0);
    }

    #[test]
    fn duplicate_entry_and_stray_exit_ignored() {
        let bars = make_bars(&[100.0, 90.0, 110.0, 130.0, 120.0]);
        let events = vec![
            event(&bars, 0, SignalKind::Exit),
            event(&bars, 1, SignalKind::Entry),
            event(&bars, 2, SignalKind::Entry),
            event(&bars, 3, SignalKind::Exit),
            event(&bars, 4, SignalKind::Exit),
        ];
        let result = simulate(&bars, &events, Source::Equity, &BacktestConfig::default()).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_index, 1);
        assert_eq!(result.trades[0].exit_index, 3);
        assert!((result.trades[0].return_pct - (130.0 / 90.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn open_position_at_end_is_not_a_trade() {
        let bars = make_bars(&[100.0, 150.0]);
        let events = vec![event(&bars, 0, SignalKind::Entry)];
        let result = simulate(&bars, &events, Source::Equity, &BacktestConfig::default()).unwrap();

        assert_eq!(result.metrics.total_trades, 0);
        assert_eq!(result.metrics.total_return, 0.0);
    }

    #[test]
    fn mark_to_market_values_open_position() {
        let bars = make_bars(&[100.0, 150.0]);
        let events = vec![event(&bars, 0, SignalKind::Entry)];
        let config = BacktestConfig {
            mark_to_market: true,
            ..BacktestConfig::default()
        };
        let result = simulate(&bars, &events, Source::Equity, &config).unwrap();

        assert_eq!(result.metrics.total_trades, 0);
        assert!((result.equity_curve[1].equity - 1.5).abs() < 1e-12);
        assert!((result.metrics.total_return - 0.5).abs() < 1e-12);
    }

    #[test]
    fn events_without_bar_are_ignored() {
        let bars = make_bars(&[100.0, 110.0]);
        let stray = SignalEvent {
            date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            index: 99,
            kind: SignalKind::Entry,
            price: 1.0,
        };
        let result = simulate(&bars, &[stray], Source::Equity, &BacktestConfig::default()).unwrap();
        assert!(result.trades.is_empty());
    }

    #[test]
    fn costs_reduce_trade_return() {
        let bars = make_bars(&[100.0, 120.0]);
        let events = vec![
            event(&bars, 0, SignalKind::Entry),
            event(&bars, 1, SignalKind::Exit),
        ];
        let config = BacktestConfig {
            commission_pct: 0.1,
            slippage_pct: 0.05,
            mark_to_market: false,
        };
        let result = simulate(&bars, &events, Source::Equity, &config).unwrap();
        let expected = 120.0 * 0.9995 * 0.999 / (100.0 * 1.0005 * 1.001) - 1.0;
        assert!((result.trades[0].return_pct - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_bars_is_analysis_error() {
        let err = simulate(&[], &[], Source::Equity, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Analysis { .. }));
    }
}
