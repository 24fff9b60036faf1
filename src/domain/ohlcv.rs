//! Price bar representation and the normalization every adapter output goes through.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (open + high + low + close) / 4
    pub fn average_price(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }

    fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

/// Sort, de-duplicate (last bar per date wins) and clip bars to `[start, end]`.
///
/// Bars with a non-finite price are dropped. An empty result is reported as
/// `DataUnavailable` so downstream stages never see a zero-length series.
pub fn normalize_bars(
    symbol: &str,
    mut bars: Vec<Bar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, EngineError> {
    bars.retain(|b| b.is_finite() && b.date >= start && b.date <= end);
    bars.sort_by_key(|b| b.date);

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }

    if out.is_empty() {
        return Err(EngineError::data_unavailable(
            symbol,
            format!("no bars between {start} and {end}"),
        ));
    }
    Ok(out)
}
