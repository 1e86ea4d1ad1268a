//! Price history
//!
//! History storage is pluggable; the default backend synthesises a series
//! around the current price so consumers always get a well-formed window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::types::{HistoryTimeframe, PricePoint};

/// Maximum relative deviation of a synthetic point from its base price
const MAX_VARIATION: f64 = 0.02;

/// Source of historical price series
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Series for `symbol` ending before `end`, oldest first.
    ///
    /// Must return exactly `timeframe.points()` points with non-decreasing
    /// timestamps.
    async fn history(
        &self,
        symbol: &str,
        base_price: f64,
        timeframe: HistoryTimeframe,
        end: DateTime<Utc>,
    ) -> Vec<PricePoint>;
}

/// Random-walk history around a base price
#[derive(Debug, Clone, Default)]
pub struct SyntheticHistory;

impl SyntheticHistory {
    pub fn new() -> Self {
        Self
    }

    fn generate(base_price: f64, timeframe: HistoryTimeframe, end: DateTime<Utc>) -> Vec<PricePoint> {
        let mut rng = rand::thread_rng();
        let n = timeframe.points();
        let step = timeframe.step();

        (0..n)
            .map(|i| {
                let timestamp = end - step * (n - i) as i32;
                let variation = rng.gen_range(-MAX_VARIATION..=MAX_VARIATION);
                let price = (base_price * (1.0 + variation) * 100.0).round() / 100.0;
                PricePoint {
                    timestamp: timestamp.timestamp(),
                    price,
                }
            })
            .collect()
    }
}

#[async_trait]
impl HistorySource for SyntheticHistory {
    async fn history(
        &self,
        symbol: &str,
        base_price: f64,
        timeframe: HistoryTimeframe,
        end: DateTime<Utc>,
    ) -> Vec<PricePoint> {
        tracing::debug!(symbol = %symbol, timeframe = %timeframe, "Synthesising price history");
        Self::generate(base_price, timeframe, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lengths_per_timeframe() {
        let source = SyntheticHistory::new();
        let end = Utc::now();
        for (tf, expected) in [
            (HistoryTimeframe::Hour1, 60),
            (HistoryTimeframe::Hour24, 288),
            (HistoryTimeframe::Day7, 168),
            (HistoryTimeframe::Day30, 720),
        ] {
            let points = source.history("BTC", 100.0, tf, end).await;
            assert_eq!(points.len(), expected, "timeframe {tf}");
        }
    }

    #[tokio::test]
    async fn test_timestamps_increase_and_prices_stay_in_band() {
        let end = Utc::now();
        let points = SyntheticHistory::new()
            .history("GOLD", 2000.0, HistoryTimeframe::Hour24, end)
            .await;

        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(points.last().unwrap().timestamp, (end - chrono::Duration::minutes(5)).timestamp());
        assert!(points.iter().all(|p| p.price >= 1959.99 && p.price <= 2040.01));
    }
}
