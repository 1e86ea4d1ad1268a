//! Static reference table
//!
//! Serves assets without a live upstream (commodities in the default setup).
//! Unknown keys fail like any other unavailable source.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::SourceError;
use crate::oracle::sources::{validate_price, PriceSource};

const SOURCE_NAME: &str = "Static";

#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    prices: HashMap<String, f64>,
}

impl StaticSource {
    pub fn new(prices: impl IntoIterator<Item = (String, f64)>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    /// Reference commodity prices
    pub fn reference() -> Self {
        Self::new([("GOLD".to_string(), 2045.30), ("OIL".to_string(), 73.50)])
    }
}

#[async_trait]
impl PriceSource for StaticSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, asset_key: &str) -> Result<f64, SourceError> {
        let price = self
            .prices
            .get(asset_key)
            .copied()
            .ok_or_else(|| SourceError::unavailable(SOURCE_NAME, asset_key, "no reference price"))?;
        validate_price(SOURCE_NAME, asset_key, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reference_prices() {
        let source = StaticSource::reference();
        assert_eq!(source.fetch("GOLD").await.unwrap(), 2045.30);
        assert_eq!(source.fetch("OIL").await.unwrap(), 73.50);
    }

    #[tokio::test]
    async fn test_unknown_key_is_unavailable() {
        let source = StaticSource::reference();
        assert!(matches!(
            source.fetch("COPPER").await,
            Err(SourceError::Unavailable { .. })
        ));
    }
}
