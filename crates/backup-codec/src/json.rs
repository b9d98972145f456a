use chrono::{DateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use watchlist_core::{
    parse_target_price, validate_target_price, Direction, ParseError, StoreError, WatchlistEntry,
    WatchlistRepository,
};

use crate::{added_date, import_record, ImportReport, RawRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEntry {
    pub id: i64,
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
    pub added_date: String,
}

impl From<&WatchlistEntry> for JsonEntry {
    fn from(entry: &WatchlistEntry) -> Self {
        Self {
            id: entry.id,
            symbol: entry.symbol.to_string(),
            target_price: entry.target_price,
            added_date: added_date(entry),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBackup {
    pub export_date: String,
    pub buy_watchlist: Vec<JsonEntry>,
    pub sell_watchlist: Vec<JsonEntry>,
    pub total_stocks: usize,
}

pub fn export_json<Tz: TimeZone>(
    entries: &[WatchlistEntry],
    now: DateTime<Tz>,
) -> Result<String, ParseError>
where
    Tz::Offset: std::fmt::Display,
{
    let side = |direction: Direction| -> Vec<JsonEntry> {
        entries
            .iter()
            .filter(|e| e.active && e.direction == direction)
            .map(JsonEntry::from)
            .collect()
    };

    let buy_watchlist = side(Direction::Buy);
    let sell_watchlist = side(Direction::Sell);
    let backup = JsonBackup {
        export_date: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        total_stocks: buy_watchlist.len() + sell_watchlist.len(),
        buy_watchlist,
        sell_watchlist,
    };

    serde_json::to_string_pretty(&backup)
        .map_err(|e| ParseError::MalformedDocument(e.to_string()))
}

/// Accepts numbers and numeric strings, keeping the decimal text exact.
fn target_from_value(value: Option<&Value>) -> Result<Decimal, ParseError> {
    match value {
        None | Some(Value::Null) => Err(ParseError::MissingField("target_price")),
        Some(Value::Number(n)) => {
            let price = Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map_err(|_| ParseError::InvalidPrice(n.to_string()))?;
            validate_target_price(price)
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ParseError::MissingField("target_price"))
        }
        Some(Value::String(s)) => parse_target_price(s),
        Some(other) => Err(ParseError::InvalidPrice(other.to_string())),
    }
}

/// Restore both watchlists from a JSON backup. Missing sections count as empty.
pub async fn import_json(
    repo: &dyn WatchlistRepository,
    text: &str,
) -> Result<ImportReport, StoreError> {
    let doc = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => {
            return Ok(ImportReport::unreadable(
                "Error parsing JSON: expected an object".to_string(),
            ))
        }
        Err(e) => return Ok(ImportReport::unreadable(format!("Error parsing JSON: {}", e))),
    };

    let mut sections = Vec::new();
    for (key, direction) in [
        ("buy_watchlist", Direction::Buy),
        ("sell_watchlist", Direction::Sell),
    ] {
        match doc.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => sections.push((direction, items)),
            Some(_) => {
                return Ok(ImportReport::unreadable(format!(
                    "Error parsing JSON: {} is not a list",
                    key
                )))
            }
        }
    }

    let mut report = ImportReport::default();
    for (direction, items) in sections {
        for item in items {
            let record = RawRecord {
                label: direction.title().to_string(),
                symbol: item.get("symbol").and_then(Value::as_str),
                target_price: target_from_value(item.get("target_price")),
                direction: Ok(direction),
            };
            import_record(repo, &mut report, record).await?;
        }
    }

    Ok(report)
}
