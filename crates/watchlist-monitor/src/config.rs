use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub database_url: String,
    pub refresh_interval_secs: u64, // 30
    pub quote_cache_ttl_secs: u64,  // 30
    pub fetch_concurrency: usize,   // 4
    pub yahoo_rate_limit: usize,    // requests per minute
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:watchlist.db".to_string(),
            refresh_interval_secs: 30,
            quote_cache_ttl_secs: 30,
            fetch_concurrency: 4,
            yahoo_rate_limit: 60,
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let parse = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a whole number, got '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            refresh_interval_secs: parse("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs)?,
            quote_cache_ttl_secs: parse("QUOTE_CACHE_TTL_SECS", defaults.quote_cache_ttl_secs)?,
            fetch_concurrency: parse("FETCH_CONCURRENCY", defaults.fetch_concurrency as u64)?
                as usize,
            yahoo_rate_limit: parse("YAHOO_RATE_LIMIT", defaults.yahoo_rate_limit as u64)?
                as usize,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            bail!("REFRESH_INTERVAL_SECS must be at least 1");
        }
        if self.fetch_concurrency == 0 {
            bail!("FETCH_CONCURRENCY must be at least 1");
        }
        if self.yahoo_rate_limit == 0 {
            bail!("YAHOO_RATE_LIMIT must be at least 1");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn quote_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = MonitorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("REFRESH_INTERVAL_SECS", "60"),
            ("FETCH_CONCURRENCY", " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.refresh_interval_secs, 60);
        assert_eq!(config.fetch_concurrency, 8);
        assert_eq!(config.quote_cache_ttl_secs, 30);
    }

    #[test]
    fn test_rejects_garbage_and_zero() {
        assert!(MonitorConfig::from_lookup(lookup(&[("REFRESH_INTERVAL_SECS", "soon")])).is_err());
        assert!(MonitorConfig::from_lookup(lookup(&[("FETCH_CONCURRENCY", "0")])).is_err());
    }
}
