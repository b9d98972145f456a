//! Target-price status classification.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. reached (`current <= target` for buys, `current >= target` for sells) → `TargetReached`
//! 2. within ±1% of target → `CloseToTarget`
//! 3. otherwise → `Waiting`
//!
//! The band is symmetric for both directions, so a sell entry slightly below
//! its target is "close" as well.

use rust_decimal::Decimal;

use crate::types::{Direction, Status};

/// Half-width of the close-to-target band, in percent.
pub const CLOSE_BAND_PERCENT: Decimal = Decimal::ONE;

/// Signed distance from target: `(current - target) / target * 100`.
///
/// `None` for a non-positive target or when the ratio does not fit in a
/// `Decimal`.
pub fn percent_from_target(current: Decimal, target: Decimal) -> Option<Decimal> {
    if target <= Decimal::ZERO {
        return None;
    }
    current
        .checked_sub(target)?
        .checked_div(target)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

pub fn is_reached(current: Decimal, target: Decimal, direction: Direction) -> bool {
    match direction {
        Direction::Buy => current <= target,
        Direction::Sell => current >= target,
    }
}

/// Classify a fetched price against its target. Never returns `Status::Error`;
/// fetch failures are classified by the caller.
pub fn classify(current: Decimal, target: Decimal, direction: Direction) -> Status {
    if is_reached(current, target, direction) {
        return Status::TargetReached;
    }

    match percent_from_target(current, target) {
        Some(pct) if pct >= -CLOSE_BAND_PERCENT && pct <= CLOSE_BAND_PERCENT => {
            Status::CloseToTarget
        }
        // unrepresentable distance is far outside the band
        _ => Status::Waiting,
    }
}
