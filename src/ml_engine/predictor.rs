//! Confidence Predictor - backend dispatch plus per-market result cache
//!
//! The active backend is held as an `Arc` and loaded once per prediction, so a
//! model swap never affects a prediction already in flight. Results are cached
//! per market until the next successful model swap; the cache carries the
//! epoch of the backend that filled it so a late result from a replaced model
//! is dropped instead of cached.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::PredictorConfig;
use crate::error::ModelLoadError;
use crate::features::FeatureVector;
use crate::ml_engine::fallback::FallbackBackend;
use crate::ml_engine::models::LinearModel;
use crate::ml_engine::{BackendKind, ModelInfo, NEUTRAL_CONFIDENCE};
use crate::types::MarketId;

/// Scoring backend selected at construction or swapped by `update_model`
#[derive(Debug, Clone)]
pub enum ScoringBackend {
    Model(LinearModel),
    Fallback(FallbackBackend),
}

impl ScoringBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            ScoringBackend::Model(_) => BackendKind::Model,
            ScoringBackend::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// Confidence and the backend that actually scored it.
    ///
    /// A model without features defers to the fallback heuristic.
    fn score(&self, market_id: MarketId, features: Option<&FeatureVector>) -> (u8, BackendKind) {
        match (self, features) {
            (ScoringBackend::Model(model), Some(features)) => {
                (score_with_model(model, market_id, features), BackendKind::Model)
            }
            (ScoringBackend::Model(_), None) => {
                (FallbackBackend::new().score(market_id, None), BackendKind::Fallback)
            }
            (ScoringBackend::Fallback(fallback), features) => {
                (fallback.score(market_id, features), BackendKind::Fallback)
            }
        }
    }
}

fn score_with_model(model: &LinearModel, market_id: MarketId, features: &FeatureVector) -> u8 {
    match model.score(features.as_slice()) {
        Ok(raw) => (raw * 100.0).round().clamp(0.0, 100.0) as u8,
        Err(e) => {
            warn!(market_id, error = %e, "Model inference failed, returning neutral confidence");
            NEUTRAL_CONFIDENCE
        }
    }
}

#[derive(Debug)]
struct ActiveBackend {
    backend: ScoringBackend,
    epoch: u64,
}

#[derive(Debug, Default)]
struct ResultCache {
    epoch: u64,
    entries: HashMap<MarketId, u8>,
}

/// Bounded confidence scores per market
pub struct ConfidencePredictor {
    active: RwLock<Arc<ActiveBackend>>,
    results: RwLock<ResultCache>,
}

impl Default for ConfidencePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfidencePredictor {
    /// Predictor with only the fallback backend
    pub fn new() -> Self {
        Self::with_backend(ScoringBackend::Fallback(FallbackBackend::new()))
    }

    pub fn with_model(model: LinearModel) -> Self {
        Self::with_backend(ScoringBackend::Model(model))
    }

    fn with_backend(backend: ScoringBackend) -> Self {
        Self {
            active: RwLock::new(Arc::new(ActiveBackend { backend, epoch: 0 })),
            results: RwLock::new(ResultCache::default()),
        }
    }

    /// Load the configured model if present; otherwise run on the fallback.
    ///
    /// A missing file is expected (no model trained yet); an unreadable or
    /// malformed one is logged and also falls back.
    pub fn from_config(config: &PredictorConfig) -> Self {
        let path = Path::new(&config.model_path);
        if !path.exists() {
            info!(path = %path.display(), "Model file not found, using fallback predictions");
            return Self::new();
        }

        match LinearModel::load(path) {
            Ok(model) => Self::with_model(model),
            Err(e) => {
                error!(error = %e, "Error loading model, using fallback predictions");
                Self::new()
            }
        }
    }

    fn active(&self) -> Arc<ActiveBackend> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Cached result for a market, if any
    pub fn cached(&self, market_id: MarketId) -> Option<u8> {
        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(&market_id)
            .copied()
    }

    /// Confidence in `[0, 100]` for `market_id`.
    ///
    /// Cached results are returned as-is. Otherwise the learned model scores
    /// the features when both are available, and the fallback scores
    /// everything else. Never fails.
    pub fn predict(&self, market_id: MarketId, features: Option<&FeatureVector>) -> u8 {
        if let Some(confidence) = self.cached(market_id) {
            debug!(market_id, confidence, "Prediction cache hit");
            return confidence;
        }

        let active = self.active();
        let (confidence, kind) = active.backend.score(market_id, features);
        let confidence = confidence.min(100);

        if !self.store(active.epoch, market_id, confidence) {
            debug!(market_id, epoch = active.epoch, "Backend replaced mid-prediction, result not cached");
        }

        info!(market_id, confidence, backend = %kind, "Prediction computed");
        confidence
    }

    /// Cache a result scored by the backend of `epoch`; dropped if that
    /// backend has since been replaced
    fn store(&self, epoch: u64, market_id: MarketId, confidence: u8) -> bool {
        let mut results = self.results.write().unwrap_or_else(PoisonError::into_inner);
        if results.epoch != epoch {
            return false;
        }
        results.entries.insert(market_id, confidence);
        true
    }

    /// Swap in the model at `path`.
    ///
    /// On failure the current backend stays active and the error is
    /// returned. On success every cached result is discarded.
    pub fn update_model(&self, path: impl AsRef<Path>) -> Result<(), ModelLoadError> {
        let model = LinearModel::load(path.as_ref()).map_err(|e| {
            error!(error = %e, "Error updating model");
            e
        })?;

        let mut results = self.results.write().unwrap_or_else(PoisonError::into_inner);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);

        let epoch = active.epoch.wrapping_add(1);
        *active = Arc::new(ActiveBackend {
            backend: ScoringBackend::Model(model),
            epoch,
        });
        results.epoch = epoch;
        let cleared = results.entries.len();
        results.entries.clear();

        info!(path = %path.as_ref().display(), epoch, cleared, "Model updated successfully");
        Ok(())
    }

    /// Drop every cached result without touching the backend
    pub fn clear_cache(&self) {
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    /// Read-only introspection
    pub fn model_info(&self) -> ModelInfo {
        let active = self.active();
        let (path, model_kind, checksum) = match &active.backend {
            ScoringBackend::Model(model) => (
                model.path().map(|p| p.display().to_string()),
                Some(model.kind()),
                model.checksum().map(str::to_string),
            ),
            ScoringBackend::Fallback(_) => (None, None, None),
        };

        ModelInfo {
            loaded: matches!(active.backend, ScoringBackend::Model(_)),
            backend: active.backend.kind(),
            model_kind,
            path,
            checksum,
            cache_size: self
                .results
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::models::ModelKind;

    fn model(bias: f64) -> LinearModel {
        LinearModel::new(ModelKind::Logistic, vec![0.0; FeatureVector::NUM_FEATURES], bias).unwrap()
    }

    #[test]
    fn test_second_call_is_cache_hit() {
        let predictor = ConfidencePredictor::new();
        let first = predictor.predict(11, None);
        assert_eq!(predictor.cached(11), Some(first));
        assert_eq!(predictor.predict(11, Some(&FeatureVector::zeros())), first);
    }

    #[test]
    fn test_model_path_rounds_probability() {
        // sigmoid(ln(3)) = 0.75
        let predictor = ConfidencePredictor::with_model(model(3f64.ln()));
        assert_eq!(predictor.predict(1, Some(&FeatureVector::zeros())), 75);
    }

    #[test]
    fn test_model_without_features_uses_fallback() {
        let predictor = ConfidencePredictor::with_model(model(3f64.ln()));
        let expected = FallbackBackend::new().score(5, None);
        assert_eq!(predictor.predict(5, None), expected);
    }

    #[test]
    fn test_model_failure_is_neutral() {
        let predictor = ConfidencePredictor::with_model(model(0.0));
        let nan = FeatureVector::new([f64::NAN; FeatureVector::NUM_FEATURES]);
        assert_eq!(predictor.predict(3, Some(&nan)), NEUTRAL_CONFIDENCE);
    }

    #[test]
    fn test_linear_model_output_is_clamped() {
        let big = LinearModel::new(ModelKind::Linear, vec![0.0; FeatureVector::NUM_FEATURES], 7.5).unwrap();
        let predictor = ConfidencePredictor::with_model(big);
        assert_eq!(predictor.predict(1, Some(&FeatureVector::zeros())), 100);

        let negative = LinearModel::new(ModelKind::Linear, vec![0.0; FeatureVector::NUM_FEATURES], -2.0).unwrap();
        let predictor = ConfidencePredictor::with_model(negative);
        assert_eq!(predictor.predict(1, Some(&FeatureVector::zeros())), 0);
    }

    #[test]
    fn test_update_model_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model(0.0).save(&path).unwrap();

        let predictor = ConfidencePredictor::new();
        predictor.predict(1, None);
        predictor.predict(2, None);
        assert_eq!(predictor.model_info().cache_size, 2);

        predictor.update_model(&path).unwrap();

        let info = predictor.model_info();
        assert!(info.loaded);
        assert_eq!(info.backend, BackendKind::Model);
        assert_eq!(info.cache_size, 0);
        assert_eq!(predictor.predict(1, Some(&FeatureVector::zeros())), 50);
    }

    #[test]
    fn test_failed_update_keeps_backend() {
        let predictor = ConfidencePredictor::with_model(model(3f64.ln()));
        predictor.predict(9, None);

        assert!(predictor.update_model("bad/path").is_err());

        let info = predictor.model_info();
        assert!(info.loaded);
        assert_eq!(info.cache_size, 1);
        assert_eq!(predictor.predict(10, Some(&FeatureVector::zeros())), 75);
    }

    #[test]
    fn test_result_from_replaced_backend_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model(0.0).save(&path).unwrap();

        let predictor = ConfidencePredictor::new();
        let in_flight = predictor.active();
        let stale = in_flight.backend.score(21, None).0;

        predictor.update_model(&path).unwrap();

        assert!(!predictor.store(in_flight.epoch, 21, stale));
        assert_eq!(predictor.cached(21), None);

        let current = predictor.active();
        assert!(predictor.store(current.epoch, 21, 50));
        assert_eq!(predictor.cached(21), Some(50));
    }

    #[test]
    fn test_fallback_variant_scores_without_model() {
        let backend = ScoringBackend::Fallback(FallbackBackend::new());
        let features = FeatureVector::zeros();
        assert_eq!(
            backend.score(42, Some(&features)),
            (FallbackBackend::new().score(42, Some(&features)), BackendKind::Fallback)
        );
    }

    #[test]
    fn test_missing_configured_model_uses_fallback() {
        let config = PredictorConfig {
            model_path: "does/not/exist.json".to_string(),
            ..PredictorConfig::default()
        };
        let info = ConfidencePredictor::from_config(&config).model_info();
        assert!(!info.loaded);
        assert_eq!(info.backend, BackendKind::Fallback);
        assert_eq!(info.path, None);
    }
}
