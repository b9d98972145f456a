use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::time::Duration;
use watchlist_core::{Bar, FetchError, PriceSnapshot, PriceSource, Symbol};

use crate::rate_limit::RateLimiter;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DEFAULT_RATE_LIMIT: usize = 60;
const MAX_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    chart_url: String,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_rate_limit(DEFAULT_RATE_LIMIT)
    }

    /// `per_minute` requests are allowed in any sliding 60s window.
    pub fn with_rate_limit(per_minute: usize) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            chart_url: CHART_URL.to_string(),
            rate_limiter: RateLimiter::new(per_minute, Duration::from_secs(60)),
        }
    }

    /// Point the client at a different chart endpoint (mirrors, local fixtures).
    pub fn with_chart_url(mut self, url: impl Into<String>) -> Self {
        self.chart_url = url.into();
        self
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let request = builder.build().map_err(|e| FetchError::Http(e.to_string()))?;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| FetchError::Http("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| FetchError::Http(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt as u64 + 1);
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/{}",
                wait_secs,
                attempt + 1,
                MAX_RETRIES
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(FetchError::RateLimited(format!(
            "Rate limited by Yahoo after {} retries",
            MAX_RETRIES
        )))
    }

    /// Daily bars for `symbol` over `range` (`5d`, `1mo`, `3mo`, ...).
    pub async fn get_chart(&self, symbol: &Symbol, range: &str) -> Result<Vec<Bar>, FetchError> {
        let url = format!("{}/{}", self.chart_url, symbol);

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("range", range), ("interval", "1d")]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        parse_chart(symbol, &body)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn fetch(&self, symbol: &Symbol) -> Result<PriceSnapshot, FetchError> {
        // Five sessions so weekends and holidays still leave two closes.
        let bars = self.get_chart(symbol, "5d").await?;
        snapshot_from_bars(symbol, &bars)
    }

    async fn daily_bars(&self, symbol: &Symbol, range: &str) -> Result<Vec<Bar>, FetchError> {
        self.get_chart(symbol, range).await
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Decode a Yahoo v8 chart payload into bars, dropping sessions without a close.
pub fn parse_chart(symbol: &Symbol, body: &str) -> Result<Vec<Bar>, FetchError> {
    let parsed: ChartResponse =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

    if let Some(err) = parsed.chart.error {
        return Err(match err.code.as_str() {
            "Not Found" => FetchError::NoData(symbol.to_string()),
            _ => FetchError::InvalidResponse(format!("{}: {}", err.code, err.description)),
        });
    }

    let result = parsed
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| FetchError::NoData(symbol.to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&quote.close, i)?;
            Some(Bar {
                timestamp: DateTime::from_timestamp(*ts, 0).unwrap_or_else(Utc::now),
                open: at(&quote.open, i).unwrap_or(close),
                high: at(&quote.high, i).unwrap_or(close),
                low: at(&quote.low, i).unwrap_or(close),
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0),
            })
        })
        .collect();

    Ok(bars)
}

/// Current close is the last bar, previous close the one before it
/// (or the same bar when only one session is available).
pub fn snapshot_from_bars(symbol: &Symbol, bars: &[Bar]) -> Result<PriceSnapshot, FetchError> {
    let last = bars
        .last()
        .ok_or_else(|| FetchError::NoData(symbol.to_string()))?;
    let previous = if bars.len() >= 2 { &bars[bars.len() - 2] } else { last };

    Ok(PriceSnapshot {
        symbol: symbol.clone(),
        current_price: to_price(last.close)?,
        previous_close: to_price(previous.close)?,
        fetched_at: Utc::now(),
    })
}

/// Closes are rounded to paise before anything compares them against a
/// target, which strips float noise such as `2461.699951171875`.
fn to_price(value: f64) -> Result<Decimal, FetchError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| FetchError::InvalidResponse(format!("Unrepresentable price {}", value)))
}
