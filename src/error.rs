//! Error taxonomy
//!
//! Per-asset and per-inference errors are absorbed where they originate and
//! turned into fallback values. Only model loading and configuration errors
//! ever reach a caller.

use std::path::PathBuf;
use thiserror::Error;

/// A single upstream fetch failed (`SourceUnavailable`)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} unavailable for {asset}: {reason}")]
    Unavailable {
        source_name: &'static str,
        asset: String,
        reason: String,
    },
    #[error("{source_name} timed out after {timeout_ms}ms for {asset}")]
    Timeout {
        source_name: &'static str,
        asset: String,
        timeout_ms: u64,
    },
    #[error("{source_name} returned an invalid price for {asset}: {detail}")]
    InvalidPrice {
        source_name: &'static str,
        asset: String,
        detail: String,
    },
}

impl SourceError {
    pub fn unavailable(source_name: &'static str, asset: &str, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            source_name,
            asset: asset.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(source_name: &'static str, asset: &str, detail: impl ToString) -> Self {
        SourceError::InvalidPrice {
            source_name,
            asset: asset.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// The learned-model backend could not score an input (`BackendUnavailable`)
#[derive(Debug, Error, PartialEq)]
pub enum BackendError {
    #[error("model expects {expected} features, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("model produced a non-finite score")]
    NonFinite,
}

/// Loading a model file failed (`ModelLoadFailure`)
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("cannot read model file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model in {path}: {detail}")]
    Shape { path: PathBuf, detail: String },
}

/// Configuration is internally inconsistent
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("symbol {0} is configured more than once")]
    DuplicateSymbol(String),
    #[error("default price for {symbol} must be finite and non-negative, got {price}")]
    InvalidDefaultPrice { symbol: String, price: f64 },
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("market {0} is configured more than once")]
    DuplicateMarket(u64),
    #[error("market {0} has a negative or non-finite stake")]
    InvalidStake(u64),
}
