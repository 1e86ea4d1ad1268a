//! Tests for feature building and confidence prediction

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use nexus_oracle::features::{FeatureBuilder, FeatureVector, NUM_FEATURES};
    use nexus_oracle::ml_engine::{
        BackendKind, ConfidencePredictor, FallbackBackend, LinearModel, ModelKind, FALLBACK_MAX,
        FALLBACK_MIN,
    };
    use nexus_oracle::oracle::PriceSnapshot;
    use nexus_oracle::types::{Category, MarketMetadata};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn random_vector(rng: &mut StdRng, scale: f64) -> FeatureVector {
        let mut values = [0.0; NUM_FEATURES];
        for v in values.iter_mut() {
            *v = rng.gen_range(-scale..scale);
        }
        FeatureVector::new(values)
    }

    fn write_model(dir: &tempfile::TempDir, name: &str, kind: ModelKind, bias: f64) -> std::path::PathBuf {
        let path = dir.path().join(name);
        LinearModel::new(kind, vec![0.0; NUM_FEATURES], bias)
            .unwrap()
            .save(&path)
            .unwrap();
        path
    }

    // ============================================================================
    // Feature builder
    // ============================================================================

    #[test]
    fn test_full_snapshot_fills_price_slots_in_category_order() {
        let snapshot = PriceSnapshot::new(Utc::now())
            .with_price(Category::Crypto, "BTC", 43250.0)
            .with_price(Category::Commodities, "GOLD", 2045.3)
            .with_price(Category::Forex, "USD_EUR", 0.92)
            .with_price(Category::Crypto, "ETH", 2280.5);

        let features = FeatureBuilder::new().build(&snapshot, &MarketMetadata::default());

        assert_eq!(features.len(), NUM_FEATURES);
        assert_eq!(&features.as_slice()[..7], &[0.92, 2045.3, 43250.0, 2280.5, 0.0, 0.0, 0.0]);
        assert_eq!(&features.as_slice()[18..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_market_metadata_does_not_change_features() {
        let snapshot = PriceSnapshot::new(Utc::now()).with_price(Category::Forex, "USD_EUR", 0.92);
        let builder = FeatureBuilder::new();

        let a = builder.build(&snapshot, &MarketMetadata::default());
        let b = builder.build(
            &snapshot,
            &MarketMetadata {
                market_id: 99,
                question: Some("Will BTC close above 50k?".to_string()),
                total_stake_yes: 10.0,
                total_stake_no: 5.0,
                ..MarketMetadata::default()
            },
        );
        assert_eq!(a, b);
    }

    // ============================================================================
    // Fallback backend
    // ============================================================================

    #[test]
    fn test_fallback_is_deterministic_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let fallback = FallbackBackend::new();

        for market_id in 0..200u64 {
            let features = random_vector(&mut rng, 1e6);
            let first = fallback.score(market_id, Some(&features));
            let second = fallback.score(market_id, Some(&features));
            assert_eq!(first, second);
            assert!((FALLBACK_MIN..=FALLBACK_MAX).contains(&first));

            let bare = fallback.score(market_id, None);
            assert!((FALLBACK_MIN..=FALLBACK_MAX).contains(&bare));
        }
    }

    #[test]
    fn test_fallback_handles_extreme_values() {
        let fallback = FallbackBackend::new();
        for value in [f64::MAX, f64::MIN, f64::INFINITY, f64::NAN, -0.0] {
            let features = FeatureVector::new([value; NUM_FEATURES]);
            let score = fallback.score(u64::MAX, Some(&features));
            assert!((FALLBACK_MIN..=FALLBACK_MAX).contains(&score));
        }
    }

    // ============================================================================
    // Predictor
    // ============================================================================

    #[test]
    fn test_repeat_predictions_are_identical() {
        let predictor = ConfidencePredictor::new();
        let features = FeatureVector::zeros();

        let first = predictor.predict(12, Some(&features));
        let second = predictor.predict(12, Some(&features));

        assert_eq!(first, second);
        assert_eq!(predictor.cached(12), Some(first));
    }

    #[test]
    fn test_model_predictions_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut weights = vec![0.0; NUM_FEATURES];
        for w in weights.iter_mut() {
            *w = rng.gen_range(-5.0..5.0);
        }
        let model = LinearModel::new(ModelKind::Linear, weights, 0.3).unwrap();
        let predictor = ConfidencePredictor::with_model(model);

        for market_id in 0..100u64 {
            let features = random_vector(&mut rng, 1e3);
            assert!(predictor.predict(market_id, Some(&features)) <= 100);
        }
    }

    #[test]
    fn test_failed_update_keeps_backend_and_cache() {
        let predictor = ConfidencePredictor::new();
        let before = predictor.predict(3, None);

        assert!(predictor.update_model("bad/path").is_err());

        let info = predictor.model_info();
        assert!(!info.loaded);
        assert_eq!(info.backend, BackendKind::Fallback);
        assert_eq!(predictor.cached(3), Some(before));
    }

    #[test]
    fn test_hot_swap_changes_scores() {
        let dir = tempfile::tempdir().unwrap();
        let high = write_model(&dir, "high.json", ModelKind::Linear, 0.9);
        let low = write_model(&dir, "low.json", ModelKind::Linear, 0.1);
        let features = FeatureVector::zeros();

        let predictor = ConfidencePredictor::new();
        predictor.update_model(&high).unwrap();
        assert_eq!(predictor.predict(1, Some(&features)), 90);

        predictor.update_model(&low).unwrap();
        assert_eq!(predictor.cached(1), None);
        assert_eq!(predictor.predict(1, Some(&features)), 10);

        let info = predictor.model_info();
        assert!(info.loaded);
        assert_eq!(info.model_kind, Some(ModelKind::Linear));
        assert_eq!(info.path, Some(low.display().to_string()));
    }

    #[test]
    fn test_concurrent_predictions_agree() {
        let predictor = Arc::new(ConfidencePredictor::new());
        let features = FeatureVector::zeros();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let predictor = Arc::clone(&predictor);
                std::thread::spawn(move || {
                    (0..50u64)
                        .map(|id| predictor.predict(id, Some(&features)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(predictor.model_info().cache_size, 50);
    }
}
