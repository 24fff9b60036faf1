//! Market data source selector and its calendar conventions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Exchange-listed equities and ETFs, daily bars on trading days.
    Equity,
    /// Exchange-pair crypto markets trading every calendar day.
    Crypto,
}

impl Source {
    /// Periods per year used for annualization.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Source::Equity => 252.0,
            Source::Crypto => 365.0,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Equity => write!(f, "equity"),
            Source::Crypto => write!(f, "crypto"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equity" | "stock" | "krx" | "yfinance" => Ok(Source::Equity),
            "crypto" | "upbit" => Ok(Source::Crypto),
            other => Err(format!("unknown source '{other}' (expected equity or crypto)")),
        }
    }
}
