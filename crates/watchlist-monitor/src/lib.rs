//! Session wiring for the NSE watchlist: configuration, the per-session
//! context that owns the alert gates, the evaluation cycle and terminal output.

pub mod analysis;
pub mod config;
pub mod context;
pub mod evaluator;
pub mod render;

pub use config::MonitorConfig;
pub use context::MonitorContext;
pub use evaluator::{evaluate_entries, evaluate_entry, run_cycle, CycleReport, FiredAlert};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use chrono::Utc;
    use notification_service::{Alert, NotificationChannel, NotificationError, NotificationService};
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::Arc;
    use watchlist_core::*;
    use watchlist_store::{NotificationLogger, WatchlistDb, WatchlistManager};

    use crate::context::MonitorContext;

    /// In-memory price source keyed by base symbol.
    #[derive(Default)]
    pub struct FakePrices {
        quotes: HashMap<String, (Decimal, Decimal)>,
        bars: HashMap<String, Vec<Bar>>,
        failing: Vec<String>,
    }

    impl FakePrices {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, base: &str, current: Decimal, previous: Decimal) -> Self {
            self.quotes.insert(base.to_string(), (current, previous));
            self
        }

        pub fn with_bars(mut self, base: &str, bars: Vec<Bar>) -> Self {
            self.bars.insert(base.to_string(), bars);
            self
        }

        pub fn failing(mut self, base: &str) -> Self {
            self.failing.push(base.to_string());
            self
        }
    }

    #[async_trait]
    impl PriceSource for FakePrices {
        async fn fetch(&self, symbol: &Symbol) -> Result<PriceSnapshot, FetchError> {
            if self.failing.iter().any(|s| s == symbol.base()) {
                return Err(FetchError::NoData(symbol.to_string()));
            }
            let (current, previous) = self
                .quotes
                .get(symbol.base())
                .ok_or_else(|| FetchError::NoData(symbol.to_string()))?;
            Ok(PriceSnapshot {
                symbol: symbol.clone(),
                current_price: *current,
                previous_close: *previous,
                fetched_at: Utc::now(),
            })
        }

        async fn daily_bars(&self, symbol: &Symbol, _range: &str) -> Result<Vec<Bar>, FetchError> {
            self.bars
                .get(symbol.base())
                .cloned()
                .ok_or_else(|| FetchError::NoData(symbol.to_string()))
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn send(&self, _alert: &Alert) -> Result<(), NotificationError> {
            Err(NotificationError::Smtp("535 authentication failed".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    pub fn failing_channel() -> Box<dyn NotificationChannel> {
        Box::new(FailingChannel)
    }

    pub async fn context(
        prices: FakePrices,
        channels: Vec<Box<dyn NotificationChannel>>,
    ) -> MonitorContext {
        let db = WatchlistDb::new("sqlite::memory:").await.unwrap();
        MonitorContext::new(
            Arc::new(WatchlistManager::new(db.clone())),
            Arc::new(NotificationLogger::new(db)),
            Arc::new(prices),
            NotificationService::with_channels(channels),
            4,
        )
    }

    pub async fn add(ctx: &MonitorContext, base: &str, target: Decimal, direction: Direction) {
        let symbol = Symbol::parse(base).unwrap();
        ctx.repo.add(&symbol, target, direction).await.unwrap();
    }

    /// Store whose every call fails as if the database were gone.
    pub struct BrokenStore;

    fn gone() -> StoreError {
        StoreError::Database("unable to open database file".into())
    }

    #[async_trait]
    impl WatchlistRepository for BrokenStore {
        async fn add(
            &self,
            _symbol: &Symbol,
            _target_price: Decimal,
            _direction: Direction,
        ) -> Result<WatchlistEntry, StoreError> {
            Err(gone())
        }

        async fn remove(&self, _symbol: &Symbol, _direction: Direction) -> Result<(), StoreError> {
            Err(gone())
        }

        async fn list(&self, _direction: Direction) -> Result<Vec<WatchlistEntry>, StoreError> {
            Err(gone())
        }

        async fn stats(&self) -> Result<WatchlistStats, StoreError> {
            Err(gone())
        }
    }

    #[async_trait]
    impl NotificationLog for BrokenStore {
        async fn log_notification(&self, _record: &NotificationRecord) -> Result<i64, StoreError> {
            Err(gone())
        }

        async fn recent_notifications(
            &self,
            _hours: i64,
        ) -> Result<Vec<NotificationRecord>, StoreError> {
            Err(gone())
        }
    }
}
