use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Periodically drops read notifications that are past retention so the
/// collection doesn't grow without bound.
pub async fn start_notification_sweeper(state: AppState) {
    tokio::spawn(async move {
        let retention = time::Duration::days(state.config.notification_retention_days);
        loop {
            sleep(SWEEP_INTERVAL).await;
            match state.store.prune_notifications(retention).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "pruned read notifications"),
                Err(err) => warn!(?err, "notification sweep failed"),
            }
        }
    });
}
