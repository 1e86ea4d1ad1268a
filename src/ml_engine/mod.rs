//! ML Engine - Confidence scoring for prediction markets
//!
//! - Learned linear/logistic model loaded from disk, hot-swappable
//! - Deterministic fallback heuristic seeded by market id
//! - Per-market result cache, invalidated on model swap

pub mod fallback;
pub mod models;
pub mod predictor;

pub use fallback::{FallbackBackend, FALLBACK_MAX, FALLBACK_MIN};
pub use models::{LinearModel, ModelFile, ModelKind};
pub use predictor::{ConfidencePredictor, ScoringBackend};

use serde::Serialize;
use std::fmt;

/// Confidence reported when the learned model fails on an input
pub const NEUTRAL_CONFIDENCE: u8 = 50;

/// Which backend produced (or would produce) a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendKind {
    Model,
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Model => write!(f, "Model"),
            BackendKind::Fallback => write!(f, "Fallback"),
        }
    }
}

/// Snapshot of the predictor's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub backend: BackendKind,
    pub model_kind: Option<ModelKind>,
    pub path: Option<String>,
    /// Hex SHA-256 of the loaded model file
    pub checksum: Option<String>,
    pub cache_size: usize,
}
