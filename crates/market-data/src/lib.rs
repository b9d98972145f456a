//! Market data for NSE listings: a Yahoo Finance chart client and a
//! short-lived quote cache that wraps any [`PriceSource`].

mod cache;
mod rate_limit;
mod yahoo;

pub use cache::CachedPriceSource;
pub use yahoo::{parse_chart, snapshot_from_bars, YahooClient};

pub use watchlist_core::PriceSource;
