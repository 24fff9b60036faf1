//! Symbol catalogs per market and the mapping from listed ticker to fetchable symbol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::source::Source;

pub const DEFAULT_EQUITY_SUFFIX: &str = "KS";
const KRX_CODE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Etf,
    Kospi,
    Upbit,
}

/// Column positions of a catalog file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLayout {
    pub ticker_col: usize,
    pub name_col: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub ticker: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.ticker.clone()
        } else {
            format!("{} - {}", self.ticker, self.name)
        }
    }
}

impl Market {
    pub fn source(&self) -> Source {
        match self {
            Market::Etf | Market::Kospi => Source::Equity,
            Market::Upbit => Source::Crypto,
        }
    }

    pub fn layout(&self) -> CatalogLayout {
        match self {
            Market::Etf => CatalogLayout {
                ticker_col: 0,
                name_col: Some(1),
            },
            Market::Kospi => CatalogLayout {
                ticker_col: 1,
                name_col: Some(2),
            },
            Market::Upbit => CatalogLayout {
                ticker_col: 0,
                name_col: None,
            },
        }
    }

    pub fn qualify(&self, ticker: &str, equity_suffix: &str) -> String {
        qualify_symbol(ticker, self.source(), equity_suffix)
    }
}

/// Fetchable symbol for a listed ticker.
///
/// Equity codes with no exchange suffix get `.{equity_suffix}`; purely numeric
/// codes are left-padded with zeros to six digits first. Crypto pairs are
/// upper-cased and otherwise untouched.
pub fn qualify_symbol(ticker: &str, source: Source, equity_suffix: &str) -> String {
    let ticker = ticker.trim().to_uppercase();
    match source {
        Source::Crypto => ticker,
        Source::Equity => {
            if ticker.contains('.') || equity_suffix.is_empty() {
                return ticker;
            }
            let code = if ticker.chars().all(|c| c.is_ascii_digit()) {
                format!("{ticker:0>width$}", width = KRX_CODE_DIGITS)
            } else {
                ticker
            };
            format!("{code}.{}", equity_suffix.trim_start_matches('.'))
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Etf => write!(f, "etf"),
            Market::Kospi => write!(f, "kospi"),
            Market::Upbit => write!(f, "upbit"),
        }
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "etf" => Ok(Market::Etf),
            "kospi" | "stock" => Ok(Market::Kospi),
            "upbit" | "crypto" => Ok(Market::Upbit),
            other => Err(format!("unknown market '{other}' (expected etf, kospi or upbit)")),
        }
    }
}
