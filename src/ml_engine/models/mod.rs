//! ML Models - Learned scoring backend loaded from disk
//!
//! A model file is JSON:
//! `{ "kind": "logistic", "weights": [21 floats], "bias": 0.0 }`.
//! `logistic` applies a sigmoid to `w·x + b`; `linear` returns it as-is and
//! relies on the caller's clamping.

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{BackendError, ModelLoadError};
use crate::features::FeatureVector;

/// Output transform applied to the linear score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Logistic,
    Linear,
}

/// On-disk representation of a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub kind: ModelKind,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

/// Linear / logistic model over a [`FeatureVector`]
#[derive(Debug, Clone)]
pub struct LinearModel {
    kind: ModelKind,
    weights: Array1<f64>,
    bias: f64,
    path: Option<PathBuf>,
    checksum: Option<String>,
}

impl LinearModel {
    /// Build from parts; the weight count must match the feature arity
    pub fn new(kind: ModelKind, weights: Vec<f64>, bias: f64) -> Result<Self, String> {
        if weights.len() != FeatureVector::NUM_FEATURES {
            return Err(format!(
                "expected {} weights, found {}",
                FeatureVector::NUM_FEATURES,
                weights.len()
            ));
        }
        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err("weights and bias must be finite".to_string());
        }
        Ok(Self {
            kind,
            weights: Array1::from(weights),
            bias,
            path: None,
            checksum: None,
        })
    }

    /// Load a model file; nothing is kept on failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ModelFile = serde_json::from_str(&json).map_err(|source| ModelLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut model = Self::new(file.kind, file.weights, file.bias).map_err(|detail| {
            ModelLoadError::Shape {
                path: path.to_path_buf(),
                detail,
            }
        })?;
        model.path = Some(path.to_path_buf());
        model.checksum = Some(hex::encode(Sha256::digest(json.as_bytes())));

        info!(
            path = %path.display(),
            kind = ?model.kind,
            checksum = model.checksum.as_deref().unwrap_or_default(),
            "Model loaded"
        );
        Ok(model)
    }

    /// Write the model in its on-disk format
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let file = ModelFile {
            kind: self.kind,
            weights: self.weights.to_vec(),
            bias: self.bias,
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// File the model was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Hex SHA-256 of the file the model was loaded from
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Raw score, a probability in `[0, 1]` for logistic models
    pub fn score(&self, features: &[f64]) -> Result<f64, BackendError> {
        if features.len() != self.weights.len() {
            return Err(BackendError::ArityMismatch {
                expected: self.weights.len(),
                got: features.len(),
            });
        }

        let z = self.weights.dot(&ArrayView1::from(features)) + self.bias;
        let raw = match self.kind {
            ModelKind::Logistic => 1.0 / (1.0 + (-z).exp()),
            ModelKind::Linear => z,
        };

        if raw.is_finite() {
            Ok(raw)
        } else {
            Err(BackendError::NonFinite)
        }
    }
}
