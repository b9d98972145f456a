use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Yahoo suffix for National Stock Exchange of India listings.
pub const MARKET_SUFFIX: &str = ".NS";

/// Exchange ticker in canonical form: uppercase base symbol plus [`MARKET_SUFFIX`].
///
/// `reliance`, ` Reliance.ns ` and `RELIANCE.NS` all canonicalize to `RELIANCE.NS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return Err(ParseError::EmptySymbol);
        }

        let base = upper.strip_suffix(MARKET_SUFFIX).unwrap_or(&upper);
        let stripped: String = base.chars().filter(|c| *c != '&' && *c != '-').collect();
        if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseError::InvalidSymbol(raw.trim().to_string()));
        }

        Ok(Self(format!("{}{}", base, MARKET_SUFFIX)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ticker without the market suffix, e.g. `TCS` for `TCS.NS`.
    pub fn base(&self) -> &str {
        self.0.strip_suffix(MARKET_SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_market_suffix() {
        let symbol = Symbol::parse("reliance").unwrap();
        assert_eq!(symbol.as_str(), "RELIANCE.NS");
        assert_eq!(symbol.base(), "RELIANCE");
    }

    #[test]
    fn test_existing_suffix_not_doubled() {
        assert_eq!(Symbol::parse(" tcs.ns ").unwrap().as_str(), "TCS.NS");
        assert_eq!(Symbol::parse("TCS.NS").unwrap(), Symbol::parse("tcs").unwrap());
    }

    #[test]
    fn test_allows_ampersand_and_hyphen() {
        assert_eq!(Symbol::parse("m&m").unwrap().as_str(), "M&M.NS");
        assert_eq!(Symbol::parse("bajaj-auto").unwrap().as_str(), "BAJAJ-AUTO.NS");
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert!(matches!(Symbol::parse("   "), Err(ParseError::EmptySymbol)));
        assert!(matches!(Symbol::parse("HDFC BANK"), Err(ParseError::InvalidSymbol(_))));
        assert!(matches!(Symbol::parse(".NS"), Err(ParseError::InvalidSymbol(_))));
    }

    #[test]
    fn test_serde_canonicalizes() {
        let symbol: Symbol = serde_json::from_str("\"infy\"").unwrap();
        assert_eq!(symbol.as_str(), "INFY.NS");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"INFY.NS\"");
    }
}
