use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use watchlist_core::{
    parse_target_price, Direction, ParseError, StoreError, WatchlistEntry, WatchlistRepository,
};

use crate::{added_date, import_record, ImportReport, RawRecord};

pub const CSV_HEADER: [&str; 6] = [
    "symbol",
    "target_price",
    "watchlist_type",
    "added_date",
    "id",
    "is_active",
];

/// Header row plus one row per active entry, buys before sells.
pub fn export_csv(entries: &[WatchlistEntry]) -> Result<String, ParseError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let csv_err = |e: csv::Error| ParseError::MalformedDocument(e.to_string());

    writer.write_record(CSV_HEADER).map_err(csv_err)?;

    for direction in Direction::ALL {
        for entry in entries
            .iter()
            .filter(|e| e.active && e.direction == direction)
        {
            writer
                .write_record([
                    entry.symbol.to_string(),
                    entry.target_price.to_string(),
                    direction.as_str().to_string(),
                    added_date(entry),
                    entry.id.to_string(),
                    "1".to_string(),
                ])
                .map_err(csv_err)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ParseError::MalformedDocument(e.to_string()))
}

/// Column positions resolved from the header row.
struct Columns {
    symbol: usize,
    target_price: usize,
    watchlist_type: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, ParseError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or(ParseError::MissingField(name))
        };
        Ok(Self {
            symbol: find("symbol")?,
            target_price: find("target_price")?,
            watchlist_type: find("watchlist_type")?,
        })
    }
}

fn field(record: &StringRecord, index: usize) -> Option<&str> {
    record.get(index).filter(|v| !v.is_empty())
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => "Unknown".to_string(),
    }
}

/// Restore entries from CSV. The header row is required; extra columns are ignored.
pub async fn import_csv(
    repo: &dyn WatchlistRepository,
    text: &str,
) -> Result<ImportReport, StoreError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = match reader.headers() {
        Ok(header) if header.iter().all(str::is_empty) => {
            return Ok(ImportReport::unreadable(
                "Error parsing CSV: missing header row".to_string(),
            ))
        }
        Ok(header) => match Columns::from_header(header) {
            Ok(columns) => columns,
            Err(e) => return Ok(ImportReport::unreadable(format!("Error parsing CSV: {}", e))),
        },
        Err(e) => return Ok(ImportReport::unreadable(format!("Error parsing CSV: {}", e))),
    };

    let mut report = ImportReport::default();
    for (line, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                report.failure_count += 1;
                report.errors.push(format!("Row {}: {}", line + 1, e));
                continue;
            }
        };

        let raw_type = field(&row, columns.watchlist_type).unwrap_or_default();
        let record = RawRecord {
            label: title_case(raw_type),
            symbol: field(&row, columns.symbol),
            target_price: match field(&row, columns.target_price) {
                Some(raw) => parse_target_price(raw),
                None => Err(ParseError::MissingField("target_price")),
            },
            direction: match field(&row, columns.watchlist_type) {
                Some(raw) => raw.parse(),
                None => Err(ParseError::MissingField("watchlist_type")),
            },
        };
        import_record(repo, &mut report, record).await?;
    }

    Ok(report)
}
