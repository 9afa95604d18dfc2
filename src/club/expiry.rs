use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use crate::store::KeyValueStore;

/// Configuration for the scheduled-entry expiry sweep.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// How often to run the sweep.
    pub sweep_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

/// Background task that periodically drops expired store entries (stale
/// scheduled-game opponent keys). Reads already filter expired entries, so
/// the sweep only reclaims space.
#[instrument(skip(store))]
pub async fn start_expiry_sweep(store: Arc<dyn KeyValueStore>, config: ExpiryConfig) {
    info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Starting expiry sweep background task"
    );

    let mut sweep_interval = interval(config.sweep_interval);

    loop {
        sweep_interval.tick().await;

        match store.sweep_expired().await {
            Ok(0) => {}
            Ok(dropped) => {
                info!(dropped, "Expiry sweep removed stale entries");
            }
            Err(e) => {
                error!(error = %e, "Expiry sweep failed");
            }
        }
    }
}
