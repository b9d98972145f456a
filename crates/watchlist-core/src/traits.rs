use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    Bar, Direction, FetchError, NotificationRecord, PriceSnapshot, StoreError, Symbol,
    WatchlistEntry, WatchlistStats,
};

/// Source of last/previous closes and daily history.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, symbol: &Symbol) -> Result<PriceSnapshot, FetchError>;

    /// Daily bars covering `range` (Yahoo range syntax: `5d`, `1mo`, `3mo`, ...).
    async fn daily_bars(&self, symbol: &Symbol, range: &str) -> Result<Vec<Bar>, FetchError>;
}

/// Watchlist CRUD with soft-delete semantics. Every read sees active entries only.
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    async fn add(
        &self,
        symbol: &Symbol,
        target_price: Decimal,
        direction: Direction,
    ) -> Result<WatchlistEntry, StoreError>;

    async fn remove(&self, symbol: &Symbol, direction: Direction) -> Result<(), StoreError>;

    /// Active entries for `direction`, most recently added first.
    async fn list(&self, direction: Direction) -> Result<Vec<WatchlistEntry>, StoreError>;

    async fn stats(&self) -> Result<WatchlistStats, StoreError>;
}

/// Audit trail of alert attempts.
/// Longest look-back accepted by [`NotificationLog::recent_notifications`].
pub const MAX_LOOKBACK_HOURS: i64 = 876_000;

#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn log_notification(&self, record: &NotificationRecord) -> Result<i64, StoreError>;

    async fn recent_notifications(&self, hours: i64)
        -> Result<Vec<NotificationRecord>, StoreError>;
}
