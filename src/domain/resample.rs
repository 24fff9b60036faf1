//! Intraday candles to daily bars.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use super::ohlcv::Bar;

const MINUTE_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

/// Candle granularity requested from an exchange feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandleInterval {
    Day,
    Minutes(u32),
}

impl CandleInterval {
    pub fn is_intraday(&self) -> bool {
        matches!(self, CandleInterval::Minutes(_))
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandleInterval::Day => write!(f, "day"),
            CandleInterval::Minutes(unit) => write!(f, "minute{unit}"),
        }
    }
}

impl FromStr for CandleInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if matches!(lower.as_str(), "day" | "days" | "1d") {
            return Ok(CandleInterval::Day);
        }
        lower
            .strip_prefix("minute")
            .and_then(|unit| unit.parse::<u32>().ok())
            .filter(|unit| MINUTE_UNITS.contains(unit))
            .map(CandleInterval::Minutes)
            .ok_or_else(|| {
                format!("unknown interval '{lower}' (expected day or minute1/3/5/10/15/30/60/240)")
            })
    }
}

/// One intraday candle stamped in exchange-local time.
#[derive(Debug, Clone, PartialEq)]
pub struct IntradayBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Group candles by local calendar date: first open, max high, min low, last
/// close, summed volume. Input order does not matter.
pub fn resample_daily(symbol: &str, mut candles: Vec<IntradayBar>) -> Vec<Bar> {
    candles.sort_by_key(|c| c.timestamp);

    let mut out: Vec<Bar> = Vec::new();
    for candle in candles {
        let date: NaiveDate = candle.timestamp.date();
        match out.last_mut() {
            Some(day) if day.date == date => {
                day.high = day.high.max(candle.high);
                day.low = day.low.min(candle.low);
                day.close = candle.close;
                day.volume += candle.volume;
            }
            _ => out.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            }),
        }
    }
    out
}
