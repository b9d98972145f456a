//! Watchlist backup and restore in two interchange formats.
//!
//! Exports only ever see active entries. Imports feed each record through
//! [`WatchlistRepository::add`] and keep going past bad records; the only
//! thing that stops an import early is the store itself going away.

mod json;
mod tabular;

pub use json::{export_json, import_json, JsonBackup, JsonEntry};
pub use tabular::{export_csv, import_csv, CSV_HEADER};

use chrono::{DateTime, Local, TimeZone};
use rust_decimal::Decimal;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use watchlist_core::{
    Direction, ParseError, StoreError, Symbol, WatchlistEntry, WatchlistRepository,
};

pub const DEFAULT_PREFIX: &str = "nse_watchlist";

/// Format used in the JSON `added_date` field and the CSV `added_date` column.
pub const ADDED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Json,
    Csv,
}

impl BackupFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            BackupFormat::Json => "json",
            BackupFormat::Csv => "csv",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for BackupFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(BackupFormat::Json),
            "csv" => Ok(BackupFormat::Csv),
            other => Err(ParseError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for BackupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `<prefix>_backup_<YYYYMMDD>_<HHMMSS>.<ext>`
pub fn backup_filename<Tz: TimeZone>(
    prefix: &str,
    format: BackupFormat,
    now: DateTime<Tz>,
) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "{}_backup_{}.{}",
        prefix,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Outcome of a best-effort import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    /// A document that could not be read at all counts as one failure.
    pub fn unreadable(message: String) -> Self {
        Self {
            success_count: 0,
            failure_count: 1,
            errors: vec![message],
        }
    }

    fn fail(&mut self, label: &str, symbol: &str, reason: impl fmt::Display) {
        self.failure_count += 1;
        self.errors.push(format!("{} - {}: {}", label, symbol, reason));
    }
}

/// Export every active entry of the store.
pub async fn export_store(
    repo: &dyn WatchlistRepository,
    format: BackupFormat,
) -> Result<String, StoreError> {
    let mut entries = Vec::new();
    for direction in Direction::ALL {
        entries.extend(repo.list(direction).await?);
    }

    let text = match format {
        BackupFormat::Json => export_json(&entries, Local::now())?,
        BackupFormat::Csv => export_csv(&entries)?,
    };
    tracing::info!("Exported {} entries as {}", entries.len(), format);
    Ok(text)
}

/// Import a document in `format` into the store.
pub async fn import_document(
    repo: &dyn WatchlistRepository,
    format: BackupFormat,
    text: &str,
) -> Result<ImportReport, StoreError> {
    let report = match format {
        BackupFormat::Json => import_json(repo, text).await?,
        BackupFormat::Csv => import_csv(repo, text).await?,
    };
    tracing::info!(
        "Import finished: {} added, {} failed",
        report.success_count,
        report.failure_count
    );
    Ok(report)
}

fn added_date(entry: &WatchlistEntry) -> String {
    entry
        .added_at
        .with_timezone(&Local)
        .format(ADDED_DATE_FORMAT)
        .to_string()
}

/// One record pulled out of a document, before validation.
pub(crate) struct RawRecord<'a> {
    pub label: String,
    pub symbol: Option<&'a str>,
    pub target_price: Result<Decimal, ParseError>,
    pub direction: Result<Direction, ParseError>,
}

/// Validate one record and hand it to the store, folding the outcome into `report`.
pub(crate) async fn import_record(
    repo: &dyn WatchlistRepository,
    report: &mut ImportReport,
    record: RawRecord<'_>,
) -> Result<(), StoreError> {
    let raw_symbol = record.symbol.unwrap_or("<missing>");

    let symbol = match record.symbol {
        Some(s) => Symbol::parse(s),
        None => Err(ParseError::MissingField("symbol")),
    };
    let parsed = symbol.and_then(|symbol| {
        let direction = record.direction?;
        let target = record.target_price?;
        Ok((symbol, target, direction))
    });

    let (symbol, target, direction) = match parsed {
        Ok(fields) => fields,
        Err(e) => {
            report.fail(&record.label, raw_symbol, e);
            return Ok(());
        }
    };

    match repo.add(&symbol, target, direction).await {
        Ok(_) => report.success_count += 1,
        Err(e) if e.is_unavailable() => return Err(e),
        Err(e) => report.fail(direction.title(), symbol.as_str(), e),
    }
    Ok(())
}
