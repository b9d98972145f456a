use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use watchlist_core::{
    validate_target_price, Direction, StoreError, Symbol, WatchlistEntry, WatchlistRepository,
    WatchlistStats,
};

use crate::db::{
    db_err, decode_decimal, decode_timestamp, encode_timestamp, is_unique_violation, WatchlistDb,
};

#[derive(Debug, sqlx::FromRow)]
struct WatchlistRow {
    id: i64,
    symbol: String,
    target_price: String,
    watchlist_type: String,
    added_date: String,
    is_active: bool,
}

impl TryFrom<WatchlistRow> for WatchlistEntry {
    type Error = StoreError;

    fn try_from(row: WatchlistRow) -> Result<Self, Self::Error> {
        Ok(WatchlistEntry {
            id: row.id,
            symbol: Symbol::parse(&row.symbol)?,
            target_price: decode_decimal(&row.target_price)?,
            direction: row.watchlist_type.parse()?,
            added_at: decode_timestamp(&row.added_date)?,
            active: row.is_active,
        })
    }
}

pub struct WatchlistManager {
    db: WatchlistDb,
}

impl WatchlistManager {
    pub fn new(db: WatchlistDb) -> Self {
        Self { db }
    }

    async fn find_active(
        &self,
        symbol: &Symbol,
        direction: Direction,
    ) -> Result<Option<WatchlistEntry>, StoreError> {
        let row = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT id, symbol, target_price, watchlist_type, added_date, is_active
            FROM watchlists
            WHERE symbol = ? AND watchlist_type = ? AND is_active = 1
            "#,
        )
        .bind(symbol.as_str())
        .bind(direction.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(db_err)?;

        row.map(WatchlistEntry::try_from).transpose()
    }
}

#[async_trait]
impl WatchlistRepository for WatchlistManager {
    async fn add(
        &self,
        symbol: &Symbol,
        target_price: Decimal,
        direction: Direction,
    ) -> Result<WatchlistEntry, StoreError> {
        let target_price = validate_target_price(target_price)?;

        if self.find_active(symbol, direction).await?.is_some() {
            return Err(StoreError::AlreadyExists {
                symbol: symbol.clone(),
                direction,
            });
        }

        let added_at = Utc::now();
        // The partial unique index settles races between the check above and this insert.
        let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO watchlists (symbol, target_price, watchlist_type, added_date, is_active)
            VALUES (?, ?, ?, ?, 1)
            RETURNING id
            "#,
        )
        .bind(symbol.as_str())
        .bind(target_price.to_string())
        .bind(direction.as_str())
        .bind(encode_timestamp(&added_at))
        .fetch_one(self.db.pool())
        .await;

        let id = match inserted {
            Ok((id,)) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::AlreadyExists {
                    symbol: symbol.clone(),
                    direction,
                })
            }
            Err(e) => return Err(db_err(e)),
        };

        tracing::info!("Added {} to {} watchlist at {}", symbol, direction, target_price);

        Ok(WatchlistEntry {
            id,
            symbol: symbol.clone(),
            target_price,
            direction,
            added_at,
            active: true,
        })
    }

    async fn remove(&self, symbol: &Symbol, direction: Direction) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE watchlists SET is_active = 0 WHERE symbol = ? AND watchlist_type = ? AND is_active = 1",
        )
        .bind(symbol.as_str())
        .bind(direction.as_str())
        .execute(self.db.pool())
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                symbol: symbol.clone(),
                direction,
            });
        }

        tracing::info!("Removed {} from {} watchlist", symbol, direction);
        Ok(())
    }

    async fn list(&self, direction: Direction) -> Result<Vec<WatchlistEntry>, StoreError> {
        let rows = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT id, symbol, target_price, watchlist_type, added_date, is_active
            FROM watchlists
            WHERE watchlist_type = ? AND is_active = 1
            ORDER BY added_date DESC, id DESC
            "#,
        )
        .bind(direction.as_str())
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        rows.into_iter().map(WatchlistEntry::try_from).collect()
    }

    async fn stats(&self) -> Result<WatchlistStats, StoreError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT watchlist_type, COUNT(*)
            FROM watchlists
            WHERE is_active = 1
            GROUP BY watchlist_type
            "#,
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(db_err)?;

        let mut stats = WatchlistStats::default();
        for (kind, count) in counts {
            match kind.parse::<Direction>()? {
                Direction::Buy => stats.buy_count = count,
                Direction::Sell => stats.sell_count = count,
            }
        }
        stats.total = stats.buy_count + stats.sell_count;

        Ok(stats)
    }
}
