//! Nexus Oracle daemon
//!
//! Keeps the oracle snapshot fresh on a fixed interval and sweeps active
//! markets through the confidence predictor until interrupted.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nexus_oracle::config::{AppConfig, LoggingConfig};
use nexus_oracle::ml_engine::ConfidencePredictor;
use nexus_oracle::oracle::sources::SourceSet;
use nexus_oracle::oracle::{spawn_refresh_loop, OracleCache};
use nexus_oracle::pipeline::{spawn_prediction_sweep, ConfidencePipeline, StaticMarketDirectory};

fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    info!(config = %config, "Starting Nexus Oracle");

    let cache = Arc::new(OracleCache::new(
        &config.oracle,
        SourceSet::from_config(&config.oracle),
    ));
    let predictor = Arc::new(ConfidencePredictor::from_config(&config.predictor));
    let model = predictor.model_info();
    info!(
        loaded = model.loaded,
        backend = %model.backend,
        checksum = model.checksum.as_deref().unwrap_or("none"),
        "Confidence predictor ready"
    );

    let initial = cache.refresh().await;
    info!(
        assets = initial.len(),
        degraded = initial.degraded().len(),
        "Initial oracle snapshot published"
    );

    let pipeline = Arc::new(ConfidencePipeline::new(
        Arc::clone(&cache),
        predictor,
        Arc::new(StaticMarketDirectory::new(config.markets.clone())),
    ));

    info!(markets = config.markets.len(), "Market directory loaded");

    let refresher = spawn_refresh_loop(Arc::clone(&cache), config.oracle.refresh_interval());
    let sweeper = spawn_prediction_sweep(
        pipeline,
        Duration::from_secs(config.predictor.prediction_sweep_secs.max(1)),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    refresher.abort();
    sweeper.abort();
    Ok(())
}
