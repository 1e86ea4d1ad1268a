//! Deterministic fallback scoring
//!
//! Used whenever no learned model can score a request. The RNG is seeded from
//! the market id alone, so a market always receives the same baseline, across
//! processes and restarts. ChaCha8 keeps its output stream fixed across `rand`
//! releases, which `StdRng` does not.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::f64::consts::PI;

use crate::features::FeatureVector;
use crate::types::MarketId;

/// Lowest confidence the fallback ever reports
pub const FALLBACK_MIN: u8 = 5;
/// Highest confidence the fallback ever reports
pub const FALLBACK_MAX: u8 = 95;

const NOISE_STD: f64 = 10.0;
const BASE_CENTER: f64 = 50.0;
const BASE_SPREAD: f64 = 30.0;

/// Model-free confidence heuristic
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackBackend;

impl FallbackBackend {
    pub fn new() -> Self {
        Self
    }

    /// First 32 bits of SHA-256 over the decimal market id
    pub fn seed(market_id: MarketId) -> u64 {
        let digest = Sha256::digest(market_id.to_string().as_bytes());
        u64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    /// Confidence in `[FALLBACK_MIN, FALLBACK_MAX]`.
    ///
    /// With features, the feature sum places a base in `[35, 65)` which is
    /// perturbed by normal noise; without, the score is uniform in `[40, 80)`.
    pub fn score(&self, market_id: MarketId, features: Option<&FeatureVector>) -> u8 {
        let mut rng = ChaCha8Rng::seed_from_u64(Self::seed(market_id));

        let confidence = match features {
            Some(features) => {
                let sum = features.sum();
                let sum = if sum.is_finite() { sum } else { 0.0 };
                let base = BASE_CENTER + sum.rem_euclid(BASE_SPREAD) - BASE_SPREAD / 2.0;
                base + standard_normal(&mut rng) * NOISE_STD
            }
            None => rng.gen_range(40.0..80.0),
        };

        confidence
            .trunc()
            .clamp(f64::from(FALLBACK_MIN), f64::from(FALLBACK_MAX)) as u8
    }
}

/// Box-Muller draw from N(0, 1)
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
