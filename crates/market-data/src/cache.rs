use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use watchlist_core::{Bar, FetchError, PriceSnapshot, PriceSource, Symbol};

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.cached_at < ttl
    }
}

/// Wraps a [`PriceSource`] and serves repeat lookups from memory for `ttl`.
///
/// Errors are never cached, so a failed symbol is retried on the next cycle.
pub struct CachedPriceSource<S> {
    inner: S,
    ttl: Duration,
    quotes: DashMap<Symbol, CacheEntry<PriceSnapshot>>,
    bars: DashMap<(Symbol, String), CacheEntry<Vec<Bar>>>,
}

impl<S: PriceSource> CachedPriceSource<S> {
    pub fn new(inner: S, ttl: std::time::Duration) -> Self {
        Self {
            inner,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(30)),
            quotes: DashMap::new(),
            bars: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop everything, forcing the next lookups to hit the network.
    pub fn clear(&self) {
        self.quotes.clear();
        self.bars.clear();
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl<S: PriceSource> PriceSource for CachedPriceSource<S> {
    async fn fetch(&self, symbol: &Symbol) -> Result<PriceSnapshot, FetchError> {
        if let Some(entry) = self.quotes.get(symbol) {
            if entry.is_fresh(self.ttl) {
                tracing::debug!("Quote cache hit for {}", symbol);
                return Ok(entry.data.clone());
            }
        }

        let snapshot = self.inner.fetch(symbol).await?;
        self.quotes.insert(
            symbol.clone(),
            CacheEntry {
                data: snapshot.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(snapshot)
    }

    async fn daily_bars(&self, symbol: &Symbol, range: &str) -> Result<Vec<Bar>, FetchError> {
        let key = (symbol.clone(), range.to_string());
        if let Some(entry) = self.bars.get(&key) {
            if entry.is_fresh(self.ttl) {
                return Ok(entry.data.clone());
            }
        }

        let bars = self.inner.daily_bars(symbol, range).await?;
        self.bars.insert(
            key,
            CacheEntry {
                data: bars.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch(&self, symbol: &Symbol) -> Result<PriceSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Http("connection reset".into()));
            }
            Ok(PriceSnapshot {
                symbol: symbol.clone(),
                current_price: dec!(101),
                previous_close: dec!(100),
                fetched_at: Utc::now(),
            })
        }

        async fn daily_bars(&self, _symbol: &Symbol, _range: &str) -> Result<Vec<Bar>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn source(fail: bool) -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn test_repeat_fetch_served_from_cache() {
        let cached = CachedPriceSource::new(source(false), std::time::Duration::from_secs(30));
        let symbol = Symbol::parse("TCS").unwrap();

        cached.fetch(&symbol).await.unwrap();
        let second = cached.fetch(&symbol).await.unwrap();

        assert_eq!(second.current_price, dec!(101));
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_refetches() {
        let cached = CachedPriceSource::new(source(false), std::time::Duration::ZERO);
        let symbol = Symbol::parse("TCS").unwrap();

        cached.fetch(&symbol).await.unwrap();
        cached.fetch(&symbol).await.unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let cached = CachedPriceSource::new(source(true), std::time::Duration::from_secs(30));
        let symbol = Symbol::parse("TCS").unwrap();

        assert!(cached.fetch(&symbol).await.is_err());
        assert!(cached.fetch(&symbol).await.is_err());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_bars_keyed_by_range() {
        let cached = CachedPriceSource::new(source(false), std::time::Duration::from_secs(30));
        let symbol = Symbol::parse("TCS").unwrap();

        cached.daily_bars(&symbol, "3mo").await.unwrap();
        cached.daily_bars(&symbol, "3mo").await.unwrap();
        cached.daily_bars(&symbol, "1mo").await.unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }
}
