//! CoinGecko simple-price client (crypto)
//!
//! Asset keys are CoinGecko coin ids (`bitcoin`, `ethereum`, ...); prices are
//! quoted in USD.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::SourceError;
use crate::oracle::sources::{http_client, validate_price, PriceSource};

const SOURCE_NAME: &str = "CoinGecko";
const VS_CURRENCY: &str = "usd";

/// `{ "<coin id>": { "usd": <price> } }`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoSource {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, asset_key: &str) -> Result<f64, SourceError> {
        let params = [("ids", asset_key), ("vs_currencies", VS_CURRENCY)];

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, asset_key, e))?;

        let body: SimplePriceResponse = response
            .json()
            .await
            .map_err(|e| SourceError::invalid(SOURCE_NAME, asset_key, e))?;

        let price = body
            .get(asset_key)
            .and_then(|quotes| quotes.get(VS_CURRENCY))
            .copied()
            .ok_or_else(|| SourceError::invalid(SOURCE_NAME, asset_key, "coin missing from response"))?;

        tracing::debug!(source = %SOURCE_NAME, asset = %asset_key, price, "Fetched crypto price");
        validate_price(SOURCE_NAME, asset_key, price)
    }
}
