//! Modified Heikin-Ashi transform.
//!
//! ha_close[t] = (O + H + L + C) / 4
//! ha_open[0]  = (O[0] + C[0]) / 2, ha_open[t] = (ha_open[t-1] + ha_close[t-1]) / 2
//! ha_high/ha_low = max/min of {H, L, ha_open, ha_close}
//!
//! Each output depends only on the bars at or before its index, so a
//! transform over a prefix reproduces a prefix of the full output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedBar {
    pub date: NaiveDate,
    pub ha_open: f64,
    pub ha_high: f64,
    pub ha_low: f64,
    pub ha_close: f64,
}

impl SmoothedBar {
    pub fn is_bullish(&self) -> bool {
        self.ha_close > self.ha_open
    }

    pub fn is_bearish(&self) -> bool {
        self.ha_close < self.ha_open
    }
}

pub fn transform(bars: &[Bar]) -> Result<Vec<SmoothedBar>, EngineError> {
    let Some(first) = bars.first() else {
        return Err(EngineError::InsufficientData {
            symbol: String::new(),
            bars: 0,
            minimum: 1,
        });
    };

    let mut out = Vec::with_capacity(bars.len());
    let mut prev: Option<SmoothedBar> = None;

    for bar in bars {
        let ha_close = bar.average_price();
        let ha_open = match prev {
            Some(p) => (p.ha_open + p.ha_close) / 2.0,
            None => (first.open + first.close) / 2.0,
        };
        let ha_high = bar.high.max(bar.low).max(ha_open).max(ha_close);
        let ha_low = bar.high.min(bar.low).min(ha_open).min(ha_close);

        let smoothed = SmoothedBar {
            date: bar.date,
            ha_open,
            ha_high,
            ha_low,
            ha_close,
        };
        out.push(smoothed);
        prev = Some(smoothed);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        ohlc.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn seed_bar() {
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 110.0, 100.0, 108.0),
            (108.0, 107.0, 90.0, 95.0),
        ]);
        let ha = transform(&bars).unwrap();

        assert_eq!(ha.len(), 3);
        assert!((ha[0].ha_open - 101.0).abs() < f64::EPSILON);
        assert!((ha[0].ha_close - 100.5).abs() < f64::EPSILON);
        assert!((ha[0].ha_high - 105.0).abs() < f64::EPSILON);
        assert!((ha[0].ha_low - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_recurrence() {
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 110.0, 100.0, 108.0),
            (108.0, 107.0, 90.0, 95.0),
        ]);
        let ha = transform(&bars).unwrap();

        // (101 + 100.5) / 2
        assert!((ha[1].ha_open - 100.75).abs() < f64::EPSILON);
        assert!((ha[1].ha_close - 105.0).abs() < f64::EPSILON);
        assert!((ha[2].ha_open - (100.75 + 105.0) / 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn high_low_envelope() {
        // high below the smoothed open on the third bar
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 110.0, 100.0, 108.0),
            (108.0, 107.0, 90.0, 95.0),
        ]);
        let ha = transform(&bars).unwrap();
        for s in &ha {
            assert!(s.ha_high >= s.ha_open && s.ha_high >= s.ha_close);
            assert!(s.ha_low <= s.ha_open && s.ha_low <= s.ha_close);
        }
        assert!((ha[2].ha_high - 107.0).abs() < f64::EPSILON);
        assert!((ha[2].ha_low - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn candle_colour() {
        let bars = make_bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 120.0, 100.0, 118.0)]);
        let ha = transform(&bars).unwrap();
        assert!(!ha[0].is_bullish() && !ha[0].is_bearish());
        assert!(ha[1].is_bullish());
    }

    #[test]
    fn empty_input_is_insufficient() {
        let err = transform(&[]).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { bars: 0, minimum: 1, .. }));
    }
}
