//! Configuration management for Nexus Oracle
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::oracle::sources::SourceKind;
use crate::types::{Category, MarketMetadata};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    pub predictor: PredictorConfig,
    pub logging: LoggingConfig,
    /// Markets swept by the periodic prediction job
    #[serde(default)]
    pub markets: Vec<MarketMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Snapshot freshness window in seconds
    pub cache_ttl_secs: u64,
    /// Background refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Upper bound for a single upstream fetch in milliseconds
    pub request_timeout_ms: u64,
    /// Base URL of the exchange-rate API (forex)
    pub forex_api_url: String,
    /// Simple-price endpoint of the CoinGecko API (crypto)
    pub crypto_api_url: String,
    /// Tracked assets, in snapshot order within each category
    #[serde(default = "default_assets")]
    pub assets: Vec<AssetConfig>,
}

/// One tracked asset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetConfig {
    /// Symbol exposed in snapshots (e.g. `BTC`, `USD_EUR`)
    pub symbol: String,
    pub category: Category,
    /// Upstream that serves this asset
    pub source: SourceKind,
    /// Identifier understood by the upstream (pair, commodity code, coin id)
    pub key: String,
    /// Value recorded when the upstream fails
    #[serde(default)]
    pub default_price: f64,
}

impl AssetConfig {
    pub fn new(
        symbol: &str,
        category: Category,
        source: SourceKind,
        key: &str,
        default_price: f64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            category,
            source,
            key: key.to_string(),
            default_price,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Model file loaded at startup; a missing file selects the fallback backend
    pub model_path: String,
    /// Interval of the background prediction sweep in seconds
    pub prediction_sweep_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// The seven assets tracked by default, with their reference prices.
pub fn default_assets() -> Vec<AssetConfig> {
    vec![
        AssetConfig::new("USD_EUR", Category::Forex, SourceKind::ExchangeRate, "USD_EUR", 0.92),
        AssetConfig::new("JPY_GBP", Category::Forex, SourceKind::ExchangeRate, "JPY_GBP", 0.0056),
        AssetConfig::new("GOLD", Category::Commodities, SourceKind::Static, "GOLD", 2045.30),
        AssetConfig::new("OIL", Category::Commodities, SourceKind::Static, "OIL", 73.50),
        AssetConfig::new("BTC", Category::Crypto, SourceKind::CoinGecko, "bitcoin", 43250.00),
        AssetConfig::new("ETH", Category::Crypto, SourceKind::CoinGecko, "ethereum", 2280.50),
        AssetConfig::new("SOL", Category::Crypto, SourceKind::CoinGecko, "solana", 98.75),
    ]
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            refresh_interval_secs: 30,
            request_timeout_ms: 5000,
            forex_api_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            crypto_api_url: "https://api.coingecko.com/api/v3/simple/price".to_string(),
            assets: default_assets(),
        }
    }
}

impl OracleConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check the invariants the snapshot relies on
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration("oracle.cache_ttl_secs"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("oracle.refresh_interval_secs"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("oracle.request_timeout_ms"));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.symbol.as_str()) {
                return Err(ConfigError::DuplicateSymbol(asset.symbol.clone()));
            }
            if !asset.default_price.is_finite() || asset.default_price < 0.0 {
                return Err(ConfigError::InvalidDefaultPrice {
                    symbol: asset.symbol.clone(),
                    price: asset.default_price,
                });
            }
        }
        Ok(())
    }
}

/// Market ids must be unique and stakes finite and non-negative
pub fn validate_markets(markets: &[MarketMetadata]) -> std::result::Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for market in markets {
        if !seen.insert(market.market_id) {
            return Err(ConfigError::DuplicateMarket(market.market_id));
        }
        let stakes = [market.total_stake_yes, market.total_stake_no];
        if stakes.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ConfigError::InvalidStake(market.market_id));
        }
    }
    Ok(())
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            model_path: "./ml/model.json".to_string(),
            prediction_sweep_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Oracle defaults
            .set_default("oracle.cache_ttl_secs", 60)?
            .set_default("oracle.refresh_interval_secs", 30)?
            .set_default("oracle.request_timeout_ms", 5000)?
            .set_default(
                "oracle.forex_api_url",
                "https://api.exchangerate-api.com/v4/latest",
            )?
            .set_default(
                "oracle.crypto_api_url",
                "https://api.coingecko.com/api/v3/simple/price",
            )?
            // Predictor defaults
            .set_default("predictor.model_path", "./ml/model.json")?
            .set_default("predictor.prediction_sweep_secs", 120)?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (NEXUS__*)
            .add_source(Environment::with_prefix("NEXUS").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .oracle
            .validate()
            .context("Invalid oracle configuration")?;
        validate_markets(&app_config.markets).context("Invalid market configuration")?;

        Ok(app_config)
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "assets={} markets={} ttl={}s refresh={}s timeout={}ms model={}",
            self.oracle.assets.len(),
            self.markets.len(),
            self.oracle.cache_ttl_secs,
            self.oracle.refresh_interval_secs,
            self.oracle.request_timeout_ms,
            self.predictor.model_path
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assets_are_valid() {
        let config = OracleConfig::default();
        assert_eq!(config.assets.len(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut config = OracleConfig::default();
        config.assets.push(AssetConfig::new(
            "BTC",
            Category::Crypto,
            SourceKind::Static,
            "BTC",
            1.0,
        ));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateSymbol("BTC".to_string()))
        );
    }

    #[test]
    fn test_negative_default_rejected() {
        let mut config = OracleConfig::default();
        config.assets[0].default_price = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDefaultPrice { .. })
        ));
    }

    #[test]
    fn test_markets_section_deserializes() {
        let toml = r#"
            [[markets]]
            market_id = 7
            question = "Will BTC close above 50k?"
            deadline = "2030-01-01T00:00:00Z"
            total_stake_yes = 120.0
            total_stake_no = 80.0
            oracle = "BTC"

            [[markets]]
            market_id = 8
        "#;
        let markets: Vec<MarketMetadata> = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .get("markets")
            .unwrap();

        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].market_id, 7);
        assert_eq!(markets[0].oracle.as_deref(), Some("BTC"));
        assert_eq!(markets[0].total_stake(), 200.0);
        assert!(markets[0].deadline.is_some());
        assert_eq!(markets[1].deadline, None);
        assert_eq!(markets[1].total_stake(), 0.0);
        assert!(validate_markets(&markets).is_ok());
    }

    #[test]
    fn test_invalid_markets_rejected() {
        let market = |market_id, total_stake_yes| MarketMetadata {
            market_id,
            total_stake_yes,
            ..MarketMetadata::default()
        };

        assert_eq!(
            validate_markets(&[market(1, 0.0), market(1, 5.0)]),
            Err(ConfigError::DuplicateMarket(1))
        );
        assert_eq!(
            validate_markets(&[market(2, -3.0)]),
            Err(ConfigError::InvalidStake(2))
        );
        assert_eq!(
            validate_markets(&[market(3, f64::NAN)]),
            Err(ConfigError::InvalidStake(3))
        );
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = OracleConfig {
            cache_ttl_secs: 0,
            ..OracleConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration("oracle.cache_ttl_secs"))
        );
    }
}
