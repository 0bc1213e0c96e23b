use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::features::quota::services::QuotaService;

/// Background worker that drops quota records whose window has ended
///
/// Keeps memory proportional to the clients seen within one window rather
/// than to every client ever seen.
pub struct QuotaSweeper {
    quota_service: Arc<QuotaService>,
    sweep_interval: Duration,
}

impl QuotaSweeper {
    pub fn new(quota_service: Arc<QuotaService>, sweep_interval: Duration) -> Self {
        Self {
            quota_service,
            sweep_interval,
        }
    }

    /// Run the sweeper in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting quota sweeper (interval: {}s)",
            self.sweep_interval.as_secs()
        );

        let mut interval = interval(self.sweep_interval);

        loop {
            interval.tick().await;
            self.sweep();
        }
    }

    /// Run a single eviction pass
    pub fn sweep(&self) -> usize {
        let evicted = self.quota_service.evict_expired();
        if evicted > 0 {
            tracing::info!(
                "Quota sweep evicted {} expired records ({} still tracked)",
                evicted,
                self.quota_service.tracked_clients()
            );
        }
        evicted
    }
}
