use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_queue_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::queue_store::memory::MemoryQueueStore, state::AppState,
    };

    #[tokio::test]
    async fn health_reports_degraded_while_the_connection_is_down() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");

        state
            .install_queue_store(std::sync::Arc::new(MemoryQueueStore::new()))
            .await;
        assert_eq!(health_status(&state).await.status, "ok");

        // A reported outage wins even while the store is still installed.
        state.update_degraded(true).await;
        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
