use anyhow::{Context, Result};
use market_data::{CachedPriceSource, YahooClient};
use notification_service::{
    AlertDispatcher, NotificationConfig, NotificationGate, NotificationService,
};
use std::sync::Arc;
use watchlist_core::{DeliveryChannel, NotificationLog, PriceSource, WatchlistRepository};
use watchlist_store::{NotificationLogger, WatchlistDb, WatchlistManager};

use crate::config::MonitorConfig;

/// Everything one monitoring session owns: collaborators plus the dedup state
/// that must survive from one cycle to the next.
pub struct MonitorContext {
    pub repo: Arc<dyn WatchlistRepository>,
    pub log: Arc<dyn NotificationLog>,
    pub prices: Arc<dyn PriceSource>,
    pub dispatcher: AlertDispatcher,
    pub target_gate: NotificationGate,
    pub breakout_gate: NotificationGate,
    pub fetch_concurrency: usize,
}

impl MonitorContext {
    pub fn new(
        repo: Arc<dyn WatchlistRepository>,
        log: Arc<dyn NotificationLog>,
        prices: Arc<dyn PriceSource>,
        notifications: NotificationService,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            repo,
            dispatcher: AlertDispatcher::new(notifications, log.clone()),
            log,
            prices,
            target_gate: NotificationGate::new(),
            breakout_gate: NotificationGate::new(),
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    /// Open the database and wire up the live Yahoo and SMTP collaborators.
    /// Failing to open the store is the one fatal error for a session.
    pub async fn connect(config: &MonitorConfig) -> Result<Self> {
        let db = WatchlistDb::new(&config.database_url)
            .await
            .context("Watchlist database is unavailable")?;

        let yahoo = YahooClient::with_rate_limit(config.yahoo_rate_limit);
        let prices = CachedPriceSource::new(yahoo, config.quote_cache_ttl());
        let notifications = NotificationService::new(&NotificationConfig::from_env());

        let ctx = Self::new(
            Arc::new(WatchlistManager::new(db.clone())),
            Arc::new(NotificationLogger::new(db)),
            Arc::new(prices),
            notifications,
            config.fetch_concurrency,
        );

        tracing::info!(
            "Monitor ready (db: {}, alerts: {}, concurrency: {})",
            config.database_url,
            ctx.channel().as_str(),
            ctx.fetch_concurrency
        );
        Ok(ctx)
    }

    pub fn channel(&self) -> DeliveryChannel {
        self.dispatcher.channel()
    }
}
