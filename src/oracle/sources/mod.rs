//! Price source implementations (exchange-rate API, CoinGecko, static reference table)

mod coingecko;
mod exchange_rate;
mod reference;

pub use coingecko::CoinGeckoSource;
pub use exchange_rate::ExchangeRateSource;
pub use reference::StaticSource;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::OracleConfig;
use crate::error::SourceError;

/// Trait for price source clients.
///
/// A source is stateless: no caching, no retries. One call performs at most
/// one upstream request and never blocks past the source's timeout.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the current price for an upstream-specific asset key
    async fn fetch(&self, asset_key: &str) -> Result<f64, SourceError>;
}

/// Upstream kinds an asset can be configured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ExchangeRate,
    CoinGecko,
    Static,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ExchangeRate => write!(f, "exchange_rate"),
            SourceKind::CoinGecko => write!(f, "coin_gecko"),
            SourceKind::Static => write!(f, "static"),
        }
    }
}

/// Registry of the sources available to a cache, keyed by kind
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: HashMap<SourceKind, Arc<dyn PriceSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard HTTP-backed set from configuration
    pub fn from_config(config: &OracleConfig) -> Self {
        let timeout = config.request_timeout();
        Self::new()
            .with(
                SourceKind::ExchangeRate,
                Arc::new(ExchangeRateSource::new(&config.forex_api_url, timeout)),
            )
            .with(
                SourceKind::CoinGecko,
                Arc::new(CoinGeckoSource::new(&config.crypto_api_url, timeout)),
            )
            .with(SourceKind::Static, Arc::new(StaticSource::reference()))
    }

    pub fn with(mut self, kind: SourceKind, source: Arc<dyn PriceSource>) -> Self {
        self.sources.insert(kind, source);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn PriceSource>> {
        self.sources.get(&kind).cloned()
    }
}

/// Build the shared HTTP client used by the REST sources
///
/// If the configured client cannot be built, a default client is returned;
/// fetches stay bounded by the cache's per-asset timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(
                error = %e,
                timeout_ms = timeout.as_millis() as u64,
                "Failed to build HTTP client, using defaults without request timeout"
            );
            reqwest::Client::new()
        }
    }
}

/// Reject prices a snapshot must never carry
pub(crate) fn validate_price(
    source_name: &'static str,
    asset_key: &str,
    price: f64,
) -> Result<f64, SourceError> {
    if !price.is_finite() || price < 0.0 {
        return Err(SourceError::invalid(source_name, asset_key, price));
    }
    Ok(price)
}
