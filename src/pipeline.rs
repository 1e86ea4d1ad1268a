//! Prediction pipeline
//!
//! Wires the oracle cache, feature builder and confidence predictor together
//! for the service layer: current snapshot → feature vector → confidence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::features::{FeatureBuilder, FeatureVector, TechnicalIndicators};
use crate::ml_engine::ConfidencePredictor;
use crate::oracle::OracleCache;
use crate::types::{HistoryTimeframe, MarketId, MarketMetadata};

/// Market registry consumed by the pipeline
#[async_trait]
pub trait MarketDirectory: Send + Sync {
    /// Metadata for one market, `None` if unknown
    async fn market(&self, market_id: MarketId) -> Option<MarketMetadata>;

    /// Markets still open for predictions
    async fn active_markets(&self) -> Vec<MarketId>;
}

/// In-memory directory
#[derive(Debug, Clone, Default)]
pub struct StaticMarketDirectory {
    markets: HashMap<MarketId, MarketMetadata>,
}

impl StaticMarketDirectory {
    pub fn new(markets: impl IntoIterator<Item = MarketMetadata>) -> Self {
        Self {
            markets: markets.into_iter().map(|m| (m.market_id, m)).collect(),
        }
    }
}

#[async_trait]
impl MarketDirectory for StaticMarketDirectory {
    async fn market(&self, market_id: MarketId) -> Option<MarketMetadata> {
        self.markets.get(&market_id).cloned()
    }

    async fn active_markets(&self) -> Vec<MarketId> {
        let now = Utc::now();
        let mut ids: Vec<MarketId> = self
            .markets
            .values()
            .filter(|m| m.deadline.map_or(true, |d| d > now))
            .map(|m| m.market_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Result of one pipeline prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub market_id: MarketId,
    pub confidence: u8,
    pub feature_count: usize,
    pub oracle_count: usize,
    /// Capture time of the snapshot the features came from
    pub last_updated: DateTime<Utc>,
}

impl PredictionReport {
    pub fn reasoning(&self) -> String {
        format!(
            "Based on {} features from {} oracles",
            self.feature_count, self.oracle_count
        )
    }
}

pub struct ConfidencePipeline {
    cache: Arc<OracleCache>,
    predictor: Arc<ConfidencePredictor>,
    markets: Arc<dyn MarketDirectory>,
    builder: FeatureBuilder,
}

impl ConfidencePipeline {
    pub fn new(
        cache: Arc<OracleCache>,
        predictor: Arc<ConfidencePredictor>,
        markets: Arc<dyn MarketDirectory>,
    ) -> Self {
        Self {
            cache,
            predictor,
            markets,
            builder: FeatureBuilder::new(),
        }
    }

    pub fn cache(&self) -> &Arc<OracleCache> {
        &self.cache
    }

    pub fn predictor(&self) -> &Arc<ConfidencePredictor> {
        &self.predictor
    }

    /// Feature vector for a market over the current snapshot
    pub async fn features(&self, market_id: MarketId) -> (FeatureVector, DateTime<Utc>, usize) {
        let snapshot = self.cache.get_current().await;
        let market = self.markets.market(market_id).await.unwrap_or_else(|| MarketMetadata {
            market_id,
            ..MarketMetadata::default()
        });
        (
            self.builder.build(&snapshot, &market),
            snapshot.taken_at(),
            snapshot.len(),
        )
    }

    /// Full prediction for one market
    pub async fn predict_market(&self, market_id: MarketId) -> PredictionReport {
        let (features, last_updated, oracle_count) = self.features(market_id).await;
        let confidence = self.predictor.predict(market_id, Some(&features));

        PredictionReport {
            market_id,
            confidence,
            feature_count: features.len(),
            oracle_count,
            last_updated,
        }
    }

    /// Re-score a batch of markets without features
    pub fn sweep(&self, market_ids: &[MarketId]) -> Vec<(MarketId, u8)> {
        market_ids
            .iter()
            .map(|id| (*id, self.predictor.predict(*id, None)))
            .collect()
    }

    /// Indicators over the symbol's recent history, most recent first
    pub async fn indicators(
        &self,
        symbol: &str,
        timeframe: HistoryTimeframe,
    ) -> Option<TechnicalIndicators> {
        let mut prices: Vec<f64> = self
            .cache
            .get_history(symbol, timeframe)
            .await
            .into_iter()
            .map(|p| p.price)
            .collect();
        prices.reverse();
        TechnicalIndicators::compute(&prices)
    }
}

/// Periodically sweep every active market
pub fn spawn_prediction_sweep(pipeline: Arc<ConfidencePipeline>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let active = pipeline.markets.active_markets().await;
            let results = pipeline.sweep(&active);
            debug!(?results, "Prediction sweep results");
            info!(markets = results.len(), "Prediction sweep complete");
        }
    })
}
