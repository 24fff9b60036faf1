//! Swing detection and Fibonacci retracement fans over smoothed candles.
//!
//! A bar `i` is a HIGH swing when its `ha_high` is the maximum of the window
//! `[i-w, i+w]` (earliest index wins ties) and it sits at least `w` bars after
//! the previously accepted swing; LOW is symmetric on `ha_low`. A swing at `i`
//! is only knowable once bar `i+w` has closed, which is what [`CycleHistory`]
//! tracks so that signal evaluation never sees a swing before its
//! confirmation bar.
//!
//! The fan is anchored on the latest HIGH and the latest LOW. The later of the
//! two is the current swing (ratio 0), the earlier one sits at ratio 1:
//!
//! price(r) = end.price + r * (start.price - end.price)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::heikin_ashi::SmoothedBar;

pub const FIB_RATIOS: [f64; 9] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.272, 1.618];

const RATIO_EPSILON: f64 = 1e-9;

pub fn is_fib_ratio(ratio: f64) -> bool {
    FIB_RATIOS.iter().any(|r| (r - ratio).abs() < RATIO_EPSILON)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingConfig {
    pub half_width: usize,
}

impl SwingConfig {
    /// Shortest series on which a swing can be confirmed.
    pub fn min_bars(&self) -> usize {
        2 * self.half_width + 1
    }
}

impl Default for SwingConfig {
    fn default() -> Self {
        SwingConfig { half_width: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub kind: SwingKind,
}

impl SwingPoint {
    /// First bar index at which this swing is known.
    pub fn confirmed_at(&self, half_width: usize) -> usize {
        self.index + half_width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPair {
    pub start: SwingPoint,
    pub end: SwingPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
    pub anchor: SwingPair,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciFan {
    pub anchor: SwingPair,
    pub confirmed_at: usize,
    pub levels: Vec<FibonacciLevel>,
}

impl FibonacciFan {
    fn new(anchor: SwingPair, confirmed_at: usize) -> Self {
        let span = anchor.start.price - anchor.end.price;
        let levels = FIB_RATIOS
            .iter()
            .map(|&ratio| FibonacciLevel {
                ratio,
                price: anchor.end.price + ratio * span,
                anchor,
            })
            .collect();
        FibonacciFan {
            anchor,
            confirmed_at,
            levels,
        }
    }

    pub fn level(&self, ratio: f64) -> Option<&FibonacciLevel> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < RATIO_EPSILON)
    }
}

fn is_window_high(smoothed: &[SmoothedBar], i: usize, w: usize) -> bool {
    let h = smoothed[i].ha_high;
    smoothed[i - w..i].iter().all(|b| b.ha_high < h)
        && smoothed[i + 1..=i + w].iter().all(|b| b.ha_high <= h)
}

fn is_window_low(smoothed: &[SmoothedBar], i: usize, w: usize) -> bool {
    let l = smoothed[i].ha_low;
    smoothed[i - w..i].iter().all(|b| b.ha_low > l)
        && smoothed[i + 1..=i + w].iter().all(|b| b.ha_low >= l)
}

fn find_swings(smoothed: &[SmoothedBar], config: &SwingConfig) -> Vec<SwingPoint> {
    let w = config.half_width;
    if w == 0 || smoothed.len() < config.min_bars() {
        return Vec::new();
    }

    let spaced = |swings: &[SwingPoint], i: usize| swings.last().is_none_or(|s| i - s.index >= w);

    let mut swings = Vec::new();
    for i in w..smoothed.len() - w {
        if is_window_high(smoothed, i, w) && spaced(&swings, i) {
            swings.push(SwingPoint {
                index: i,
                date: smoothed[i].date,
                price: smoothed[i].ha_high,
                kind: SwingKind::High,
            });
        }
        if is_window_low(smoothed, i, w) && spaced(&swings, i) {
            swings.push(SwingPoint {
                index: i,
                date: smoothed[i].date,
                price: smoothed[i].ha_low,
                kind: SwingKind::Low,
            });
        }
    }
    swings
}

fn anchor_pair(swings: &[SwingPoint]) -> Option<SwingPair> {
    let high = swings.iter().rev().find(|s| s.kind == SwingKind::High)?;
    let low = swings.iter().rev().find(|s| s.kind == SwingKind::Low)?;
    let (start, end) = if high.index < low.index {
        (*high, *low)
    } else {
        (*low, *high)
    };
    Some(SwingPair { start, end })
}

/// Confirmed swings and the current retracement fan of a smoothed series.
///
/// Fewer than two swings is a valid "nothing detected" outcome and yields two
/// empty sequences.
pub fn detect(
    smoothed: &[SmoothedBar],
    config: &SwingConfig,
) -> (Vec<SwingPoint>, Vec<FibonacciLevel>) {
    let swings = find_swings(smoothed, config);
    if swings.len() < 2 {
        return (Vec::new(), Vec::new());
    }
    let last_confirmed = swings[swings.len() - 1].confirmed_at(config.half_width);
    let levels = anchor_pair(&swings)
        .map(|pair| FibonacciFan::new(pair, last_confirmed).levels)
        .unwrap_or_default();
    (swings, levels)
}

/// Walk-forward view of swings and fans, indexed by bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleHistory {
    half_width: usize,
    swings: Vec<SwingPoint>,
    fans: Vec<FibonacciFan>,
    fan_at: Vec<Option<usize>>,
}

impl CycleHistory {
    pub fn build(smoothed: &[SmoothedBar], config: &SwingConfig) -> Self {
        let w = config.half_width;
        let swings = find_swings(smoothed, config);

        // every confirmed swing replaces the fan in full
        let mut fans = Vec::new();
        for k in 0..swings.len() {
            if let Some(pair) = anchor_pair(&swings[..=k]) {
                fans.push(FibonacciFan::new(pair, swings[k].confirmed_at(w)));
            }
        }

        let mut fan_at = Vec::with_capacity(smoothed.len());
        let mut current: Option<usize> = None;
        let mut next = 0;
        for k in 0..smoothed.len() {
            while next < fans.len() && fans[next].confirmed_at <= k {
                current = Some(next);
                next += 1;
            }
            fan_at.push(current);
        }

        CycleHistory {
            half_width: w,
            swings,
            fans,
            fan_at,
        }
    }

    /// Every swing in the series, including ones confirmed only at the last bars.
    pub fn swings(&self) -> &[SwingPoint] {
        &self.swings
    }

    pub fn fans(&self) -> &[FibonacciFan] {
        &self.fans
    }

    /// Position in [`Self::fans`] of the fan in force at bar `k`.
    pub fn fan_index_at(&self, k: usize) -> Option<usize> {
        self.fan_at.get(k).copied().flatten()
    }

    pub fn fan_as_of(&self, k: usize) -> Option<&FibonacciFan> {
        self.fan_index_at(k).map(|i| &self.fans[i])
    }

    /// Swings confirmed at or before bar `k`; empty while fewer than two are known.
    pub fn swings_as_of(&self, k: usize) -> &[SwingPoint] {
        let w = self.half_width;
        let count = self.swings.partition_point(|s| s.confirmed_at(w) <= k);
        if count < 2 { &[] } else { &self.swings[..count] }
    }

    pub fn levels_as_of(&self, k: usize) -> &[FibonacciLevel] {
        self.fan_as_of(k).map(|f| f.levels.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleDirection {
    /// Current anchor is a LOW; price is working up from it.
    Advancing,
    /// Current anchor is a HIGH.
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleEstimate {
    pub mean_period_bars: f64,
    pub bars_since_anchor: usize,
    pub phase: f64,
    pub direction: CycleDirection,
}

/// Estimate where bar `as_of` sits in the swing cycle.
///
/// The period is the mean spacing between consecutive swings of the same kind;
/// a half-period separates a LOW from the following HIGH, so phase runs from 0
/// at the anchor to 1 where the opposite swing is due.
pub fn estimate_cycle(swings: &[SwingPoint], as_of: usize) -> Option<CycleEstimate> {
    let mut spacings = Vec::new();
    for kind in [SwingKind::High, SwingKind::Low] {
        let indices: Vec<usize> = swings
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.index)
            .collect();
        spacings.extend(indices.windows(2).map(|w| (w[1] - w[0]) as f64));
    }
    if spacings.is_empty() {
        return None;
    }

    let mean_period_bars = spacings.iter().sum::<f64>() / spacings.len() as f64;
    let anchor = swings.last()?;
    let bars_since_anchor = as_of.saturating_sub(anchor.index);
    let phase = (bars_since_anchor as f64 / (mean_period_bars / 2.0)).min(1.0);
    let direction = match anchor.kind {
        SwingKind::Low => CycleDirection::Advancing,
        SwingKind::High => CycleDirection::Declining,
    };

    Some(CycleEstimate {
        mean_period_bars,
        bars_since_anchor,
        phase,
        direction,
    })
}
