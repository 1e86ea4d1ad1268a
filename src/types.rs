//! Core types used throughout Nexus Oracle
//!
//! Defines asset categories, market identifiers, market metadata and
//! history timeframes shared by the oracle, feature and prediction layers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market identifier as issued by the market registry
pub type MarketId = u64;

/// Tracked asset categories.
///
/// Declaration order is the canonical iteration order (forex, commodities,
/// crypto) and defines the positional meaning of the raw feature slots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Forex,
    Commodities,
    Crypto,
}

impl Category {
    /// All categories in canonical order
    pub const ALL: [Category; 3] = [Category::Forex, Category::Commodities, Category::Crypto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Forex => "forex",
            Category::Commodities => "commodities",
            Category::Crypto => "crypto",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forex" | "fx" => Ok(Category::Forex),
            "commodities" | "commodity" => Ok(Category::Commodities),
            "crypto" => Ok(Category::Crypto),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}

/// Market metadata supplied by the external market registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketMetadata {
    pub market_id: MarketId,
    pub question: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub total_stake_yes: f64,
    pub total_stake_no: f64,
    /// Oracle symbol the market resolves against, if any
    pub oracle: Option<String>,
}

impl MarketMetadata {
    pub fn total_stake(&self) -> f64 {
        self.total_stake_yes + self.total_stake_no
    }
}

/// One point of a price history series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub price: f64,
}

/// Supported history windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryTimeframe {
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "24h")]
    Hour24,
    #[serde(rename = "7d")]
    Day7,
    #[serde(rename = "30d")]
    Day30,
}

impl Default for HistoryTimeframe {
    fn default() -> Self {
        HistoryTimeframe::Hour24
    }
}

impl HistoryTimeframe {
    /// Number of points a history of this window contains
    pub fn points(&self) -> usize {
        match self {
            HistoryTimeframe::Hour1 => 60,
            HistoryTimeframe::Hour24 => 288,
            HistoryTimeframe::Day7 => 168,
            HistoryTimeframe::Day30 => 720,
        }
    }

    /// Spacing between consecutive points
    pub fn step(&self) -> Duration {
        match self {
            HistoryTimeframe::Hour1 => Duration::minutes(1),
            HistoryTimeframe::Hour24 => Duration::minutes(5),
            HistoryTimeframe::Day7 | HistoryTimeframe::Day30 => Duration::hours(1),
        }
    }
}

impl fmt::Display for HistoryTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryTimeframe::Hour1 => write!(f, "1h"),
            HistoryTimeframe::Hour24 => write!(f, "24h"),
            HistoryTimeframe::Day7 => write!(f, "7d"),
            HistoryTimeframe::Day30 => write!(f, "30d"),
        }
    }
}

impl FromStr for HistoryTimeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1h" => Ok(HistoryTimeframe::Hour1),
            "24h" => Ok(HistoryTimeframe::Hour24),
            "7d" => Ok(HistoryTimeframe::Day7),
            "30d" => Ok(HistoryTimeframe::Day30),
            other => Err(format!("unsupported timeframe '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_canonical() {
        let mut cats = vec![Category::Crypto, Category::Forex, Category::Commodities];
        cats.sort();
        assert_eq!(cats, Category::ALL.to_vec());
    }

    #[test]
    fn test_timeframe_points() {
        assert_eq!("1h".parse::<HistoryTimeframe>().unwrap().points(), 60);
        assert_eq!("24h".parse::<HistoryTimeframe>().unwrap().points(), 288);
        assert_eq!("7d".parse::<HistoryTimeframe>().unwrap().points(), 168);
        assert_eq!("30d".parse::<HistoryTimeframe>().unwrap().points(), 720);
        assert!("2w".parse::<HistoryTimeframe>().is_err());
        assert!("1d".parse::<HistoryTimeframe>().is_err());
    }
}
