use rust_decimal::Decimal;
use thiserror::Error;

use crate::symbol::Symbol;
use crate::types::Direction;

/// Malformed user or file input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Symbol cannot be empty")]
    EmptySymbol,

    #[error("Invalid symbol format: {0}")]
    InvalidSymbol(String),

    #[error("Invalid watchlist type: {0}")]
    InvalidDirection(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Target price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Target price must be at least 0.01, got {0}")]
    BelowMinimumPrice(Decimal),

    #[error("Look-back window must be between 1 and {max} hours, got {hours}")]
    InvalidWindow { hours: i64, max: i64 },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unsupported backup format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// Market data could not be retrieved for a symbol.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("No price data for {0}")]
    NoData(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

/// Watchlist persistence failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{symbol} already exists in {direction} watchlist")]
    AlreadyExists { symbol: Symbol, direction: Direction },

    #[error("Stock {symbol} not found in {direction} watchlist")]
    NotFound { symbol: Symbol, direction: Direction },

    #[error(transparent)]
    Invalid(#[from] ParseError),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// True for failures that mean the store itself is unreachable,
    /// as opposed to a rejected operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Database(_))
    }
}
