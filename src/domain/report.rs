//! Assembled analysis result and its renderer-agnostic plot series.

use chrono::NaiveDate;
use serde::Serialize;

use super::analysis::AnalysisRequest;
use super::backtest::BacktestResult;
use super::fibonacci::{CycleEstimate, CycleHistory, FibonacciLevel, SwingKind, SwingPoint};
use super::heikin_ashi::SmoothedBar;
use super::metrics::EquityPoint;
use super::ohlcv::Bar;
use super::signal::{SignalEvent, SignalKind};

/// Everything one analysis produced. Built once by [`crate::domain::analysis::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub request: AnalysisRequest,
    pub bars: Vec<Bar>,
    pub smoothed: Vec<SmoothedBar>,
    #[serde(skip)]
    pub cycle: CycleHistory,
    /// Swings confirmed by the last bar.
    pub swings: Vec<SwingPoint>,
    /// Fan in force at the last bar.
    pub levels: Vec<FibonacciLevel>,
    pub events: Vec<SignalEvent>,
    pub result: BacktestResult,
    pub buy_signal: bool,
    pub cycle_estimate: Option<CycleEstimate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotCandle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ha_open: f64,
    pub ha_high: f64,
    pub ha_low: f64,
    pub ha_close: f64,
}

/// Horizontal level drawn over the bars its fan was in force.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotLevel {
    pub ratio: f64,
    pub price: f64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    SwingHigh,
    SwingLow,
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotMarker {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub symbol: String,
    pub candles: Vec<PlotCandle>,
    pub levels: Vec<PlotLevel>,
    pub swings: Vec<PlotMarker>,
    pub signals: Vec<PlotMarker>,
    pub equity: Vec<EquityPoint>,
}

impl AnalysisReport {
    pub fn plot_series(&self) -> PlotSeries {
        let candles = self
            .bars
            .iter()
            .zip(&self.smoothed)
            .map(|(b, s)| PlotCandle {
                date: b.date,
                open: b.open,
                high: b.high,
                low: b.low,
                close: b.close,
                ha_open: s.ha_open,
                ha_high: s.ha_high,
                ha_low: s.ha_low,
                ha_close: s.ha_close,
            })
            .collect();

        let swings = self
            .swings
            .iter()
            .map(|s| PlotMarker {
                date: s.date,
                price: s.price,
                kind: match s.kind {
                    SwingKind::High => MarkerKind::SwingHigh,
                    SwingKind::Low => MarkerKind::SwingLow,
                },
            })
            .collect();

        let signals = self
            .events
            .iter()
            .map(|e| PlotMarker {
                date: e.date,
                price: e.price,
                kind: match e.kind {
                    SignalKind::Entry => MarkerKind::Entry,
                    SignalKind::Exit => MarkerKind::Exit,
                },
            })
            .collect();

        PlotSeries {
            symbol: self.request.symbol.clone(),
            candles,
            levels: self.level_segments(),
            swings,
            signals,
            equity: self.result.equity_curve.clone(),
        }
    }

    fn level_segments(&self) -> Vec<PlotLevel> {
        let mut segments = Vec::new();
        let mut k = 0;
        while k < self.smoothed.len() {
            let Some(fan) = self.cycle.fan_index_at(k) else {
                k += 1;
                continue;
            };
            let first = k;
            while k + 1 < self.smoothed.len() && self.cycle.fan_index_at(k + 1) == Some(fan) {
                k += 1;
            }
            let (from, to) = (self.smoothed[first].date, self.smoothed[k].date);
            segments.extend(self.cycle.fans()[fan].levels.iter().map(|l| PlotLevel {
                ratio: l.ratio,
                price: l.price,
                from,
                to,
            }));
            k += 1;
        }
        segments
    }
}
