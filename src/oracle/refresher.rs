//! Background refresh driver

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::oracle::OracleCache;

/// Refresh `cache` every `period`, starting immediately.
///
/// Runs until the returned handle is aborted. A slow refresh delays the next
/// tick instead of bursting to catch up.
pub fn spawn_refresh_loop(cache: Arc<OracleCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_secs = period.as_secs_f64(), "Oracle refresh loop started");

        loop {
            ticker.tick().await;
            let snapshot = cache.refresh().await;
            tracing::debug!(
                taken_at = %snapshot.taken_at(),
                degraded = snapshot.degraded().len(),
                "Scheduled oracle refresh complete"
            );
        }
    })
}
