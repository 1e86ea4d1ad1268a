//! Feature Builder - Fixed-shape numeric encoding of oracle state
//!
//! Every vector has exactly [`FeatureVector::NUM_FEATURES`] slots:
//! - 0..7: the first seven snapshot prices in canonical category order
//!   (forex, commodities, crypto), zero-padded or truncated
//! - 7..21: statistics over that seven-price window, three reserved slots last
//!
//! Slot meaning is part of the contract with any trained scoring backend, so
//! the order below must never change.

pub mod indicators;

pub use indicators::TechnicalIndicators;

use serde::{Deserialize, Serialize};

use crate::oracle::PriceSnapshot;
use crate::types::MarketMetadata;

/// Number of slots in every feature vector
pub const NUM_FEATURES: usize = 21;

/// Number of raw price slots at the head of the vector
pub const PRICE_WINDOW: usize = 7;

/// Ordered feature vector consumed by the scoring backends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    pub const NUM_FEATURES: usize = NUM_FEATURES;

    pub fn new(values: [f64; Self::NUM_FEATURES]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; Self::NUM_FEATURES])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Slot names, index-aligned with the vector
    pub fn feature_names() -> [&'static str; Self::NUM_FEATURES] {
        [
            "price_0",
            "price_1",
            "price_2",
            "price_3",
            "price_4",
            "price_5",
            "price_6",
            "mean",
            "momentum",
            "volatility",
            "max",
            "min",
            "first",
            "last",
            "down_steps",
            "up_steps",
            "first_last_ratio",
            "normalized_range",
            "reserved_0",
            "reserved_1",
            "reserved_2",
        ]
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = Vec<f64>;

    /// Accepts only vectors of exactly `NUM_FEATURES` values
    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        <[f64; Self::NUM_FEATURES]>::try_from(values).map(Self)
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Stateless builder turning a snapshot into a [`FeatureVector`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Deterministic: the same snapshot always yields the same vector.
    ///
    /// Market metadata is accepted for interface stability; the current slot
    /// layout derives from prices only.
    pub fn build(&self, snapshot: &PriceSnapshot, market: &MarketMetadata) -> FeatureVector {
        let window = Self::price_window(snapshot);
        let derived = Self::derive(&window);

        let mut values = [0.0; NUM_FEATURES];
        values[..PRICE_WINDOW].copy_from_slice(&window);
        values[PRICE_WINDOW..].copy_from_slice(&derived);

        tracing::trace!(market_id = market.market_id, "Built feature vector");
        FeatureVector(values)
    }

    /// First seven prices in canonical order, zero-padded
    fn price_window(snapshot: &PriceSnapshot) -> [f64; PRICE_WINDOW] {
        let mut window = [0.0; PRICE_WINDOW];
        for (slot, price) in window.iter_mut().zip(snapshot.values()) {
            *slot = price;
        }
        window
    }

    fn derive(w: &[f64; PRICE_WINDOW]) -> [f64; NUM_FEATURES - PRICE_WINDOW] {
        let n = PRICE_WINDOW as f64;
        let first = w[0];
        let last = w[PRICE_WINDOW - 1];

        let mean = w.iter().sum::<f64>() / n;
        let variance = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let max = w.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = w.iter().cloned().fold(f64::INFINITY, f64::min);

        let down_steps = w.windows(2).filter(|p| p[0] > p[1]).count() as f64;
        let up_steps = w.windows(2).filter(|p| p[0] < p[1]).count() as f64;

        let ratio = if last != 0.0 { first / last } else { 1.0 };
        let normalized_range = if max != 0.0 { (max - min) / max } else { 0.0 };

        [
            mean,
            first - last,
            variance.sqrt(),
            max,
            min,
            first,
            last,
            down_steps,
            up_steps,
            ratio,
            normalized_range,
            0.0,
            0.0,
            0.0,
        ]
    }
}
