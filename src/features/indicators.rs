//! Technical indicators over a recent price series

use serde::{Deserialize, Serialize};

/// Minimum series length for indicators to be defined
pub const MIN_PRICES: usize = 14;

/// Indicators over a price series ordered most recent first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub sma_7: f64,
    pub sma_14: f64,
    /// `prices[0] - prices[6]`
    pub momentum: f64,
    /// Population standard deviation of the latest seven prices
    pub volatility: f64,
    /// +1 when the latest price is above the one six steps back, else -1
    pub trend: i8,
}

impl TechnicalIndicators {
    /// `None` when fewer than [`MIN_PRICES`] prices are available
    pub fn compute(prices: &[f64]) -> Option<Self> {
        if prices.len() < MIN_PRICES {
            return None;
        }

        let sma_7 = prices[..7].iter().sum::<f64>() / 7.0;
        let sma_14 = prices[..14].iter().sum::<f64>() / 14.0;
        let variance = prices[..7].iter().map(|p| (p - sma_7).powi(2)).sum::<f64>() / 7.0;

        Some(Self {
            sma_7,
            sma_14,
            momentum: prices[0] - prices[6],
            volatility: variance.sqrt(),
            trend: if prices[0] > prices[6] { 1 } else { -1 },
        })
    }
}
