//! Oracle Cache - Serves the latest snapshot and refreshes it when stale
//!
//! The published snapshot lives in a `watch` channel: the single writer swaps
//! in a new `Arc<PriceSnapshot>`, readers clone the `Arc`. Refreshes are
//! serialised by a mutex and de-duplicated by a generation counter, so a caller
//! that queued behind an in-flight refresh receives that refresh's result.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::{AssetConfig, OracleConfig};
use crate::error::SourceError;
use crate::oracle::history::{HistorySource, SyntheticHistory};
use crate::oracle::sources::SourceSet;
use crate::oracle::PriceSnapshot;
use crate::types::{HistoryTimeframe, PricePoint};

/// Base price for histories of symbols without a positive current price
const UNKNOWN_SYMBOL_BASE_PRICE: f64 = 100.0;

/// Published snapshot plus staleness bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    snapshot: Arc<PriceSnapshot>,
    ttl: Duration,
    generation: u64,
}

impl CacheEntry {
    pub fn snapshot(&self) -> Arc<PriceSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of refreshes published before and including this one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `now - taken_at > ttl`; a snapshot from the future is never stale
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.snapshot.taken_at()).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }
}

/// Fail-soft price cache over all configured assets
pub struct OracleCache {
    assets: Vec<AssetConfig>,
    sources: SourceSet,
    ttl: Duration,
    fetch_timeout: Duration,
    published: watch::Sender<Option<CacheEntry>>,
    refresh_lock: Mutex<()>,
    history: Arc<dyn HistorySource>,
}

impl OracleCache {
    pub fn new(config: &OracleConfig, sources: SourceSet) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            assets: config.assets.clone(),
            sources,
            ttl: config.cache_ttl(),
            fetch_timeout: config.request_timeout(),
            published,
            refresh_lock: Mutex::new(()),
            history: Arc::new(SyntheticHistory::new()),
        }
    }

    /// Replace the history backend (e.g. with a time-series store)
    pub fn with_history(mut self, history: Arc<dyn HistorySource>) -> Self {
        self.history = history;
        self
    }

    /// Override the configured freshness window
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Observe every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<CacheEntry>> {
        self.published.subscribe()
    }

    /// Current entry without triggering a refresh
    pub fn entry(&self) -> Option<CacheEntry> {
        self.published.borrow().clone()
    }

    /// Current snapshot without triggering a refresh
    pub fn peek(&self) -> Option<Arc<PriceSnapshot>> {
        self.entry().map(|e| e.snapshot())
    }

    /// True when no snapshot has been published or the published one is stale
    pub fn is_stale(&self) -> bool {
        self.entry()
            .map(|e| e.is_stale(Utc::now()))
            .unwrap_or(true)
    }

    fn generation(&self) -> u64 {
        self.published
            .borrow()
            .as_ref()
            .map(|e| e.generation)
            .unwrap_or(0)
    }

    /// Fetch every configured asset and publish a new snapshot.
    ///
    /// Never fails: assets whose upstream fails carry their configured
    /// default. If another refresh completes while this call waits for the
    /// lock, its snapshot is returned instead of fetching again.
    pub async fn refresh(&self) -> Arc<PriceSnapshot> {
        let seen = self.generation();
        let _guard = self.refresh_lock.lock().await;

        if let Some(entry) = self.entry() {
            if entry.generation != seen {
                debug!(generation = entry.generation, "Joined in-flight oracle refresh");
                return entry.snapshot();
            }
        }

        let snapshot = Arc::new(self.fetch_snapshot().await);
        let generation = seen.wrapping_add(1);

        self.published.send_replace(Some(CacheEntry {
            snapshot: Arc::clone(&snapshot),
            ttl: self.ttl,
            generation,
        }));

        if snapshot.is_degraded() {
            warn!(
                generation,
                degraded = ?snapshot.degraded(),
                assets = snapshot.len(),
                "Oracle refresh degraded, default prices in use"
            );
        } else {
            info!(generation, assets = snapshot.len(), "Oracle prices refreshed");
        }

        snapshot
    }

    /// Published snapshot if fresh, otherwise a synchronous refresh
    pub async fn get_current(&self) -> Arc<PriceSnapshot> {
        if let Some(entry) = self.entry() {
            if !entry.is_stale(Utc::now()) {
                return entry.snapshot();
            }
            debug!(taken_at = %entry.snapshot.taken_at(), "Oracle snapshot stale, refreshing");
        }
        self.refresh().await
    }

    /// Price of `symbol` in the current snapshot, searching all categories
    pub async fn get_consensus_price(&self, symbol: &str) -> Option<f64> {
        self.get_current().await.price(symbol)
    }

    /// Price series for `symbol` over `timeframe`, oldest first
    pub async fn get_history(&self, symbol: &str, timeframe: HistoryTimeframe) -> Vec<PricePoint> {
        let base_price = self
            .get_consensus_price(symbol)
            .await
            .filter(|price| *price > 0.0)
            .unwrap_or(UNKNOWN_SYMBOL_BASE_PRICE);
        self.history
            .history(symbol, base_price, timeframe, Utc::now())
            .await
    }

    async fn fetch_snapshot(&self) -> PriceSnapshot {
        let results = join_all(self.assets.iter().map(|asset| self.fetch_asset(asset))).await;

        let mut snapshot = PriceSnapshot::new(Utc::now());
        for (asset, result) in self.assets.iter().zip(results) {
            match result {
                Ok(price) => {
                    snapshot = snapshot.with_price(asset.category, &asset.symbol, price);
                }
                Err(e) => {
                    warn!(
                        symbol = %asset.symbol,
                        source = %asset.source,
                        error = %e,
                        default_price = asset.default_price,
                        "Price source unavailable, using default"
                    );
                    snapshot = snapshot
                        .with_price(asset.category, &asset.symbol, asset.default_price)
                        .with_degraded(&asset.symbol);
                }
            }
        }
        snapshot
    }

    async fn fetch_asset(&self, asset: &AssetConfig) -> Result<f64, SourceError> {
        let source = self.sources.get(asset.source).ok_or_else(|| {
            SourceError::unavailable("Registry", &asset.key, format!("no {} source", asset.source))
        })?;

        match tokio::time::timeout(self.fetch_timeout, source.fetch(&asset.key)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                source_name: source.name(),
                asset: asset.key.clone(),
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            }),
        }
    }
}
