//! Buy/exit signal rules over smoothed candles and the walk-forward cycle view.
//!
//! Both entry points share [`is_entry_at`]: the latest-bar check is the same
//! rule the historical replay applies at each bar, evaluated with only the
//! data available at that bar.
//!
//! # Rules
//!
//! Let `L` be the trigger-ratio price of the fan in force at bar `k`.
//!
//! - Entry: `ha_close` crossed up through `L` (`prev < L <= curr`) at some bar
//!   in the last `lookback_bars`, is still at or above `L`, and the candle at
//!   `k` is bullish (when `require_bullish`).
//! - Exit: the last `exit_bearish_bars` candles are all bearish, or `ha_close`
//!   crossed down through `L` at `k` (when `exit_on_level_break`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::fibonacci::CycleHistory;
use crate::domain::heikin_ashi::SmoothedBar;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub trigger_ratio: f64,
    pub lookback_bars: usize,
    pub require_bullish: bool,
    pub exit_bearish_bars: usize,
    pub exit_on_level_break: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            trigger_ratio: 0.618,
            lookback_bars: 3,
            require_bullish: true,
            exit_bearish_bars: 2,
            exit_on_level_break: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub date: NaiveDate,
    pub index: usize,
    pub kind: SignalKind,
    pub price: f64,
}

fn trigger_price(cycle: &CycleHistory, k: usize, config: &SignalConfig) -> Option<f64> {
    cycle
        .fan_as_of(k)?
        .level(config.trigger_ratio)
        .map(|l| l.price)
}

pub fn is_entry_at(
    smoothed: &[SmoothedBar],
    cycle: &CycleHistory,
    k: usize,
    config: &SignalConfig,
) -> bool {
    if k >= smoothed.len() {
        return false;
    }
    let Some(level) = trigger_price(cycle, k, config) else {
        return false;
    };

    let current = &smoothed[k];
    if current.ha_close < level {
        return false;
    }
    if config.require_bullish && !current.is_bullish() {
        return false;
    }

    let first = (k + 1).saturating_sub(config.lookback_bars).max(1);
    (first..=k).any(|j| smoothed[j - 1].ha_close < level && smoothed[j].ha_close >= level)
}

pub fn is_exit_at(
    smoothed: &[SmoothedBar],
    cycle: &CycleHistory,
    k: usize,
    config: &SignalConfig,
) -> bool {
    if k >= smoothed.len() {
        return false;
    }

    let run = config.exit_bearish_bars;
    if run > 0 && k + 1 >= run && smoothed[k + 1 - run..=k].iter().all(|s| s.is_bearish()) {
        return true;
    }

    if config.exit_on_level_break && k >= 1 {
        if let Some(level) = trigger_price(cycle, k, config) {
            return smoothed[k - 1].ha_close >= level && smoothed[k].ha_close < level;
        }
    }
    false
}

/// Buy signal for the most recent bar. No data or no fan means no signal.
pub fn evaluate_latest(smoothed: &[SmoothedBar], cycle: &CycleHistory, config: &SignalConfig) -> bool {
    match smoothed.len() {
        0 => false,
        n => is_entry_at(smoothed, cycle, n - 1, config),
    }
}

/// Replay the rules bar by bar, emitting alternating ENTRY/EXIT events.
///
/// Event prices are the raw closes of `bars`, which must be index-aligned
/// with `smoothed`.
pub fn evaluate_history(
    smoothed: &[SmoothedBar],
    bars: &[Bar],
    cycle: &CycleHistory,
    config: &SignalConfig,
) -> Vec<SignalEvent> {
    let mut events = Vec::new();
    let mut open = false;

    for k in 0..smoothed.len().min(bars.len()) {
        let kind = if !open && is_entry_at(smoothed, cycle, k, config) {
            SignalKind::Entry
        } else if open && is_exit_at(smoothed, cycle, k, config) {
            SignalKind::Exit
        } else {
            continue;
        };
        open = kind == SignalKind::Entry;
        events.push(SignalEvent {
            date: bars[k].date,
            index: k,
            kind,
            price: bars[k].close,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fibonacci::SwingConfig;

    const W2: SwingConfig = SwingConfig { half_width: 2 };

    // (ha_open, ha_high, ha_low, ha_close)
    const CANDLES: [(f64, f64, f64, f64); 13] = [
        (10.0, 11.0, 9.0, 10.0),
        (12.0, 13.0, 11.0, 12.0),
        (14.0, 15.0, 13.0, 14.0),
        (12.0, 13.0, 11.0, 12.0),
        (10.0, 11.0, 9.0, 10.0),
        (8.0, 9.0, 7.0, 8.0),
        (9.0, 10.0, 8.0, 9.0),
        (9.5, 11.0, 9.0, 10.5),
        (10.5, 12.5, 10.0, 12.4),
        (11.45, 14.0, 11.0, 13.5),
        (12.5, 15.0, 12.0, 14.5),
        (13.5, 14.0, 12.0, 12.8),
        (13.15, 13.5, 11.0, 11.5),
    ];

    fn fixture(len: usize) -> (Vec<SmoothedBar>, Vec<Bar>) {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let smoothed: Vec<SmoothedBar> = CANDLES[..len]
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| SmoothedBar {
                date: start + chrono::Duration::days(i as i64),
                ha_open: o,
                ha_high: h,
                ha_low: l,
                ha_close: c,
            })
            .collect();
        let bars = smoothed
            .iter()
            .map(|s| Bar {
                symbol: "TEST".into(),
                date: s.date,
                open: s.ha_open,
                high: s.ha_high,
                low: s.ha_low,
                close: s.ha_close,
                volume: 1.0,
            })
            .collect();
        (smoothed, bars)
    }

    #[test]
    fn entry_on_cross_through_trigger() {
        let (smoothed, _) = fixture(13);
        let cycle = CycleHistory::build(&smoothed, &W2);
        let config = SignalConfig::default();

        assert!(!is_entry_at(&smoothed, &cycle, 7, &config));
        assert!(is_entry_at(&smoothed, &cycle, 8, &config));
    }

    #[test]
    fn lookback_window_limits_stale_crosses() {
        let (smoothed, _) = fixture(13);
        let cycle = CycleHistory::build(&smoothed, &W2);

        let wide = SignalConfig::default();
        let narrow = SignalConfig {
            lookback_bars: 1,
            ..SignalConfig::default()
        };
        assert!(is_entry_at(&smoothed, &cycle, 9, &wide));
        assert!(!is_entry_at(&smoothed, &cycle, 9, &narrow));
    }

    #[test]
    fn bearish_candle_blocks_entry_unless_disabled() {
        let (mut smoothed, _) = fixture(9);
        smoothed[8].ha_open = 12.6;
        let cycle = CycleHistory::build(&smoothed, &W2);

        let strict = SignalConfig::default();
        let loose = SignalConfig {
            require_bullish: false,
            ..SignalConfig::default()
        };
        assert!(!is_entry_at(&smoothed, &cycle, 8, &strict));
        assert!(is_entry_at(&smoothed, &cycle, 8, &loose));
    }

    #[test]
    fn exit_after_bearish_run() {
        let (smoothed, _) = fixture(13);
        let cycle = CycleHistory::build(&smoothed, &W2);
        let config = SignalConfig::default();

        assert!(!is_exit_at(&smoothed, &cycle, 11, &config));
        assert!(is_exit_at(&smoothed, &cycle, 12, &config));
    }

    #[test]
    fn history_alternates_entry_exit() {
        let (smoothed, bars) = fixture(13);
        let cycle = CycleHistory::build(&smoothed, &W2);
        let events = evaluate_history(&smoothed, &bars, &cycle, &SignalConfig::default());

        assert_eq!(events.len(), 2);
        assert_eq!((events[0].kind, events[0].index), (SignalKind::Entry, 8));
        assert_eq!((events[1].kind, events[1].index), (SignalKind::Exit, 12));
        assert!((events[0].price - 12.4).abs() < f64::EPSILON);
        assert!((events[1].price - 11.5).abs() < f64::EPSILON);
    }

    #[test]
    fn latest_matches_rule_at_last_bar() {
        let config = SignalConfig::default();

        let (smoothed, _) = fixture(9);
        let cycle = CycleHistory::build(&smoothed, &W2);
        assert!(evaluate_latest(&smoothed, &cycle, &config));

        let (smoothed, _) = fixture(13);
        let cycle = CycleHistory::build(&smoothed, &W2);
        assert!(!evaluate_latest(&smoothed, &cycle, &config));
    }

    #[test]
    fn no_fan_means_no_signal() {
        let (smoothed, bars) = fixture(1);
        let cycle = CycleHistory::build(&smoothed, &SwingConfig::default());
        assert!(!evaluate_latest(&smoothed, &cycle, &SignalConfig::default()));
        assert!(evaluate_history(&smoothed, &bars, &cycle, &SignalConfig::default()).is_empty());
        assert!(!evaluate_latest(&[], &cycle, &SignalConfig::default()));
    }
}
