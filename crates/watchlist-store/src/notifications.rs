use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use watchlist_core::{
    NotificationLog, NotificationRecord, ParseError, StoreError, Symbol, MAX_LOOKBACK_HOURS,
};

use crate::db::{db_err, decode_decimal, decode_timestamp, encode_timestamp, WatchlistDb};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    symbol: String,
    watchlist_type: String,
    current_price: String,
    target_price: String,
    notification_type: String,
    sent_at: String,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(NotificationRecord {
            id: Some(row.id),
            symbol: Symbol::parse(&row.symbol)?,
            direction: row.watchlist_type.parse()?,
            current_price: decode_decimal(&row.current_price)?,
            target_price: decode_decimal(&row.target_price)?,
            channel: row.notification_type.parse()?,
            sent_at: decode_timestamp(&row.sent_at)?,
        })
    }
}

/// Writes and reads the `notification_logs` audit table.
pub struct NotificationLogger {
    db: WatchlistDb,
}

impl NotificationLogger {
    pub fn new(db: WatchlistDb) -> Self {
        Self { db }
    }
}

/// Start of a look-back window ending at `now`.
fn window_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, StoreError> {
    let invalid = || {
        StoreError::Invalid(ParseError::InvalidWindow {
            hours,
            max: MAX_LOOKBACK_HOURS,
        })
    };
    if !(1..=MAX_LOOKBACK_HOURS).contains(&hours) {
        return Err(invalid());
    }
    Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(invalid)
}

#[async_trait]
impl NotificationLog for NotificationLogger {
    async fn log_notification(&self, record: &NotificationRecord) -> Result<i64, StoreError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO notification_logs
            (symbol, watchlist_type, current_price, target_price, notification_type, sent_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(record.symbol.as_str())
        .bind(record.direction.as_str())
        .bind(record.current_price.to_string())
        .bind(record.target_price.to_string())
        .bind(record.channel.as_str())
        .bind(encode_timestamp(&record.sent_at))
        .fetch_one(self.db.pool())
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    async fn recent_notifications(
        &self,
        hours: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let cutoff = window_start(Utc::now(), hours)?;

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, symbol, watchlist_type, current_price, target_price, notification_type, sent_at
            FROM notification_logs
            WHERE sent_at >= ?
            ORDER BY sent_at DESC, id DESC
            "#,
        )
        .bind(encode_timestamp(&cutoff))
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        rows.into_iter().map(NotificationRecord::try_from).collect()
    }
}
