use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::symbol::Symbol;

/// Which side of the target counts as "reached".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Buy, Direction::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Direction::Buy => "Buy",
            Direction::Sell => "Sell",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            other => Err(ParseError::InvalidDirection(other.to_string())),
        }
    }
}

/// Smallest accepted target, one paisa.
pub const MIN_TARGET_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Parse a user-supplied target price, rejecting zero, negatives and
/// anything finer than a paisa.
pub fn parse_target_price(raw: &str) -> Result<Decimal, ParseError> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| ParseError::InvalidPrice(raw.trim().to_string()))?;
    validate_target_price(price)
}

pub fn validate_target_price(price: Decimal) -> Result<Decimal, ParseError> {
    if price <= Decimal::ZERO {
        return Err(ParseError::NonPositivePrice(price));
    }
    if price < MIN_TARGET_PRICE {
        return Err(ParseError::BelowMinimumPrice(price));
    }
    Ok(price)
}

/// A tracked (symbol, target, direction) record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub id: i64,
    pub symbol: Symbol,
    pub target_price: Decimal,
    pub direction: Direction,
    pub added_at: DateTime<Utc>,
    pub active: bool,
}

/// Active entry counts by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistStats {
    pub buy_count: i64,
    pub sell_count: i64,
    pub total: i64,
}

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Last close and previous session close for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: Symbol,
    pub current_price: Decimal,
    pub previous_close: Decimal,
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn change(&self) -> Decimal {
        self.current_price - self.previous_close
    }

    pub fn change_percent(&self) -> Decimal {
        if self.previous_close.is_zero() {
            return Decimal::ZERO;
        }
        self.change()
            .checked_div(self.previous_close)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    TargetReached,
    CloseToTarget,
    Waiting,
    Error,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::TargetReached => "🎯 TARGET REACHED",
            Status::CloseToTarget => "🔥 CLOSE TO TARGET",
            Status::Waiting => "⏳ WAITING",
            Status::Error => "❌ ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of evaluating one watchlist entry against a fresh price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub symbol: Symbol,
    pub direction: Direction,
    pub target_price: Decimal,
    pub current_price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub percent_from_target: Option<Decimal>,
    pub status: Status,
    pub added_at: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    Email,
    InApp,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Email => "email",
            DeliveryChannel::InApp => "app",
        }
    }
}

impl FromStr for DeliveryChannel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(DeliveryChannel::Email),
            "app" | "inapp" => Ok(DeliveryChannel::InApp),
            other => Err(ParseError::MalformedDocument(format!(
                "unknown notification channel '{}'",
                other
            ))),
        }
    }
}

/// Append-only audit entry for an alert attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Option<i64>,
    pub symbol: Symbol,
    pub direction: Direction,
    pub current_price: Decimal,
    pub target_price: Decimal,
    pub channel: DeliveryChannel,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_round_trip_text() {
        assert_eq!("BUY".parse::<Direction>().unwrap(), Direction::Buy);
        assert_eq!(" sell ".parse::<Direction>().unwrap(), Direction::Sell);
        assert!("hold".parse::<Direction>().is_err());
        assert_eq!(Direction::Sell.to_string(), "sell");
    }

    #[test]
    fn test_parse_target_price() {
        assert_eq!(parse_target_price("2450.75").unwrap(), dec!(2450.75));
        assert!(matches!(
            parse_target_price("0"),
            Err(ParseError::NonPositivePrice(_))
        ));
        assert!(matches!(
            parse_target_price("-5"),
            Err(ParseError::NonPositivePrice(_))
        ));
        assert!(matches!(
            parse_target_price("abc"),
            Err(ParseError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_target_below_one_paisa_rejected() {
        assert_eq!(parse_target_price("0.01").unwrap(), MIN_TARGET_PRICE);
        assert!(matches!(
            parse_target_price("0.009"),
            Err(ParseError::BelowMinimumPrice(_))
        ));
        assert!(matches!(
            validate_target_price(dec!(0.0000000000000000000000000001)),
            Err(ParseError::BelowMinimumPrice(_))
        ));
    }

    #[test]
    fn test_snapshot_change() {
        let snapshot = PriceSnapshot {
            symbol: Symbol::parse("TCS").unwrap(),
            current_price: dec!(110),
            previous_close: dec!(100),
            fetched_at: Utc::now(),
        };
        assert_eq!(snapshot.change(), dec!(10));
        assert_eq!(snapshot.change_percent(), dec!(10));
    }

    #[test]
    fn test_snapshot_change_percent_zero_previous() {
        let snapshot = PriceSnapshot {
            symbol: Symbol::parse("TCS").unwrap(),
            current_price: dec!(110),
            previous_close: Decimal::ZERO,
            fetched_at: Utc::now(),
        };
        assert_eq!(snapshot.change_percent(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_change_percent_overflow_is_zero() {
        let snapshot = PriceSnapshot {
            symbol: Symbol::parse("TCS").unwrap(),
            current_price: dec!(1000000000),
            previous_close: dec!(0.0000000000000000000000000001),
            fetched_at: Utc::now(),
        };
        assert_eq!(snapshot.change_percent(), Decimal::ZERO);
    }
}
