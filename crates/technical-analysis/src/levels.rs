use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use watchlist_core::{Bar, Direction};

/// Bars on each side a pivot must dominate.
pub const DEFAULT_LOOKBACK: usize = 20;
/// Levels reported per side.
pub const MAX_LEVELS: usize = 3;
/// History requested for a level scan.
pub const LEVELS_RANGE: &str = "3mo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pivot {
    Low,
    High,
}

/// Values at index `i` that are the extreme of `values[i - lookback..=i + lookback]`.
fn pivots(values: &[f64], lookback: usize, pivot: Pivot) -> Vec<f64> {
    let mut found = Vec::new();
    if lookback == 0 || values.len() < lookback * 2 {
        return found;
    }

    for i in lookback..values.len() - lookback {
        let window = &values[i - lookback..=i + lookback];
        let extreme = match pivot {
            Pivot::Low => window.iter().copied().fold(f64::INFINITY, f64::min),
            Pivot::High => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        if values[i] == extreme {
            found.push(values[i]);
        }
    }

    found.sort_by(f64::total_cmp);
    found.dedup();
    found
}

/// Pivot lows below the last close, strongest (highest) first.
pub fn support_levels(bars: &[Bar], lookback: usize) -> Vec<f64> {
    let current = match bars.last() {
        Some(bar) => bar.close,
        None => return Vec::new(),
    };
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let mut levels: Vec<f64> = pivots(&lows, lookback, Pivot::Low)
        .into_iter()
        .filter(|level| *level < current)
        .collect();
    levels.reverse();
    levels.truncate(MAX_LEVELS);
    levels
}

/// Pivot highs above the last close, nearest (lowest) first.
pub fn resistance_levels(bars: &[Bar], lookback: usize) -> Vec<f64> {
    let current = match bars.last() {
        Some(bar) => bar.close,
        None => return Vec::new(),
    };
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();

    let mut levels: Vec<f64> = pivots(&highs, lookback, Pivot::High)
        .into_iter()
        .filter(|level| *level > current)
        .collect();
    levels.truncate(MAX_LEVELS);
    levels
}

/// Suggested target derived from the level scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalTarget {
    pub kind: LevelKind,
    pub level: f64,
    pub current_price: f64,
}

impl TechnicalTarget {
    /// Level rounded to paise, `None` if it cannot be represented.
    pub fn target_price(&self) -> Option<Decimal> {
        Decimal::from_f64(self.level).map(|d| d.round_dp(2))
    }

    pub fn describe(&self) -> String {
        let label = match self.kind {
            LevelKind::Support => "Support",
            LevelKind::Resistance => "Resistance",
        };
        format!(
            "{} at ₹{:.2} (Current: ₹{:.2})",
            label, self.level, self.current_price
        )
    }
}

/// Sell entries target the nearest support, buy entries the nearest resistance.
pub fn technical_target(bars: &[Bar], direction: Direction) -> Option<TechnicalTarget> {
    let current_price = bars.last()?.close;
    let (kind, level) = match direction {
        Direction::Sell => (
            LevelKind::Support,
            support_levels(bars, DEFAULT_LOOKBACK).first().copied()?,
        ),
        Direction::Buy => (
            LevelKind::Resistance,
            resistance_levels(bars, DEFAULT_LOOKBACK).first().copied()?,
        ),
    };

    Some(TechnicalTarget {
        kind,
        level,
        current_price,
    })
}

/// Plain-text report of the nearest levels on each side.
pub fn levels_summary(symbol: &str, bars: &[Bar]) -> String {
    let current = match bars.last() {
        Some(bar) => bar.close,
        None => return format!("{}: no price history available", symbol),
    };

    let mut summary = format!("{} Technical Analysis\nCurrent Price: ₹{:.2}\n", symbol, current);

    let supports = support_levels(bars, DEFAULT_LOOKBACK);
    if !supports.is_empty() {
        summary.push_str("\nSupport Levels:\n");
        for (i, level) in supports.iter().enumerate() {
            summary.push_str(&format!("{}. ₹{:.2}\n", i + 1, level));
        }
    }

    let resistances = resistance_levels(bars, DEFAULT_LOOKBACK);
    if !resistances.is_empty() {
        summary.push_str("\nResistance Levels:\n");
        for (i, level) in resistances.iter().enumerate() {
            summary.push_str(&format!("{}. ₹{:.2}\n", i + 1, level));
        }
    }

    if supports.is_empty() && resistances.is_empty() {
        summary.push_str("\nNo clear support or resistance levels found\n");
    }

    summary
}
