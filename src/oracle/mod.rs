//! Oracle module - Multi-source price aggregation
//!
//! Collects prices for every tracked asset from its configured upstream and
//! publishes them as immutable, complete snapshots with a staleness policy.

mod cache;
mod history;
mod refresher;
pub mod sources;

pub use cache::{CacheEntry, OracleCache};
pub use history::{HistorySource, SyntheticHistory};
pub use refresher::spawn_refresh_loop;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::types::Category;

/// Price of one tracked asset inside a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPrice {
    pub symbol: String,
    pub price: f64,
}

/// One point-in-time capture of all tracked asset prices.
///
/// Every configured symbol is present exactly once; assets whose upstream
/// failed carry their configured default and are listed in `degraded`.
/// Snapshots are built once and published behind an `Arc`, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSnapshot {
    #[serde(serialize_with = "serialize_categories")]
    categories: BTreeMap<Category, Vec<AssetPrice>>,
    taken_at: DateTime<Utc>,
    degraded: Vec<String>,
}

impl PriceSnapshot {
    /// Empty snapshot with all categories present
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            categories: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            taken_at,
            degraded: Vec::new(),
        }
    }

    /// Append a price; symbols keep insertion order within their category
    pub fn with_price(mut self, category: Category, symbol: &str, price: f64) -> Self {
        self.categories.entry(category).or_default().push(AssetPrice {
            symbol: symbol.to_string(),
            price,
        });
        self
    }

    /// Mark a symbol as served from its default value
    pub fn with_degraded(mut self, symbol: &str) -> Self {
        self.degraded.push(symbol.to_string());
        self
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Symbols that fell back to their default in this snapshot
    pub fn degraded(&self) -> &[String] {
        &self.degraded
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    /// Prices of one category in stable order
    pub fn category(&self, category: Category) -> &[AssetPrice] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look a symbol up across categories in canonical order
    pub fn price(&self, symbol: &str) -> Option<f64> {
        Category::ALL
            .iter()
            .flat_map(|c| self.category(*c))
            .find(|p| p.symbol == symbol)
            .map(|p| p.price)
    }

    /// All prices in canonical order (forex, commodities, crypto)
    pub fn values(&self) -> Vec<f64> {
        Category::ALL
            .iter()
            .flat_map(|c| self.category(*c))
            .map(|p| p.price)
            .collect()
    }

    /// Number of assets in the snapshot
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct PricesAsMap<'a>(&'a [AssetPrice]);

impl Serialize for PricesAsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in self.0 {
            map.serialize_entry(&p.symbol, &p.price)?;
        }
        map.end()
    }
}

fn serialize_categories<S: Serializer>(
    categories: &BTreeMap<Category, Vec<AssetPrice>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(categories.len()))?;
    for (category, prices) in categories {
        map.serialize_entry(category, &PricesAsMap(prices))?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceSnapshot {
        PriceSnapshot::new(Utc::now())
            .with_price(Category::Crypto, "BTC", 43250.0)
            .with_price(Category::Forex, "USD_EUR", 0.92)
            .with_price(Category::Crypto, "ETH", 2280.5)
    }

    #[test]
    fn test_values_follow_category_order() {
        assert_eq!(sample().values(), vec![0.92, 43250.0, 2280.5]);
    }

    #[test]
    fn test_price_lookup() {
        let snapshot = sample();
        assert_eq!(snapshot.price("ETH"), Some(2280.5));
        assert_eq!(snapshot.price("GOLD"), None);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_serializes_as_nested_maps() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["categories"]["forex"]["USD_EUR"], 0.92);
        assert_eq!(json["categories"]["crypto"]["BTC"], 43250.0);
        assert!(json["categories"]["commodities"].as_object().unwrap().is_empty());
    }
}
