use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use watchlist_core::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakoutKind {
    /// Closed below a sell level after closing at or above it.
    SupportBroken,
    /// Still below a sell level that was already broken.
    BelowSupport,
    /// Closed above a buy level after closing at or below it.
    ResistanceBroken,
    AboveResistance,
}

impl BreakoutKind {
    pub fn label(&self) -> &'static str {
        match self {
            BreakoutKind::SupportBroken => "Support broken",
            BreakoutKind::BelowSupport => "Below support",
            BreakoutKind::ResistanceBroken => "Resistance broken",
            BreakoutKind::AboveResistance => "Above resistance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakout {
    pub kind: BreakoutKind,
    pub level: Decimal,
    pub current_close: Decimal,
    pub previous_close: Decimal,
}

impl Breakout {
    /// True only on the session the level was crossed.
    pub fn is_fresh(&self) -> bool {
        matches!(
            self.kind,
            BreakoutKind::SupportBroken | BreakoutKind::ResistanceBroken
        )
    }

    pub fn describe(&self) -> String {
        let side = match self.kind {
            BreakoutKind::SupportBroken | BreakoutKind::BelowSupport => "below",
            BreakoutKind::ResistanceBroken | BreakoutKind::AboveResistance => "above",
        };
        format!(
            "{}: ₹{} closed {} ₹{}",
            self.kind.label(),
            self.current_close,
            side,
            self.level
        )
    }
}

/// Compare the last two daily closes against a watchlist level.
///
/// Sell entries treat the level as support, buy entries as resistance.
pub fn check_breakout(
    current_close: Decimal,
    previous_close: Decimal,
    level: Decimal,
    direction: Direction,
) -> Option<Breakout> {
    let kind = match direction {
        Direction::Sell if current_close < level => {
            if previous_close >= level {
                BreakoutKind::SupportBroken
            } else {
                BreakoutKind::BelowSupport
            }
        }
        Direction::Buy if current_close > level => {
            if previous_close <= level {
                BreakoutKind::ResistanceBroken
            } else {
                BreakoutKind::AboveResistance
            }
        }
        _ => return None,
    };

    Some(Breakout {
        kind,
        level,
        current_close,
        previous_close,
    })
}
