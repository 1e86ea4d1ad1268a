//! Exchange-rate REST client (forex pairs)
//!
//! Asset keys are `BASE_QUOTE` pairs such as `USD_EUR`. The latest rate table
//! for the base currency is fetched and the quote currency read from it.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::SourceError;
use crate::oracle::sources::{http_client, validate_price, PriceSource};

const SOURCE_NAME: &str = "ExchangeRate";

#[derive(Debug, Clone, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct ExchangeRateSource {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeRateSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn split_pair(asset_key: &str) -> Result<(String, String), SourceError> {
        let (base, quote) = asset_key
            .split_once(['_', '/'])
            .ok_or_else(|| SourceError::unavailable(SOURCE_NAME, asset_key, "expected BASE_QUOTE"))?;
        if base.is_empty() || quote.is_empty() {
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                asset_key,
                "expected BASE_QUOTE",
            ));
        }
        Ok((base.to_uppercase(), quote.to_uppercase()))
    }
}

#[async_trait]
impl PriceSource for ExchangeRateSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, asset_key: &str) -> Result<f64, SourceError> {
        let (base, quote) = Self::split_pair(asset_key)?;
        let url = format!("{}/{}", self.base_url, base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::unavailable(SOURCE_NAME, asset_key, e))?;

        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::invalid(SOURCE_NAME, asset_key, e))?;

        let rate = body
            .rates
            .get(&quote)
            .copied()
            .ok_or_else(|| SourceError::invalid(SOURCE_NAME, asset_key, format!("no rate for {quote}")))?;

        tracing::debug!(source = %SOURCE_NAME, asset = %asset_key, rate, "Fetched forex rate");
        validate_price(SOURCE_NAME, asset_key, rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        let (base, quote) = ExchangeRateSource::split_pair("usd_eur").unwrap();
        assert_eq!(base, "USD");
        assert_eq!(quote, "EUR");

        let (base, quote) = ExchangeRateSource::split_pair("JPY/GBP").unwrap();
        assert_eq!(base, "JPY");
        assert_eq!(quote, "GBP");
    }

    #[test]
    fn test_split_pair_rejects_bare_symbol() {
        assert!(ExchangeRateSource::split_pair("USDEUR").is_err());
        assert!(ExchangeRateSource::split_pair("USD_").is_err());
    }
}
