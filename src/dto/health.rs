use serde::Serialize;
use utoipa::ToSchema;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the storage connection is down.
    pub status: String,
}

impl HealthResponse {
    /// Storage is reachable and calls can be issued.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    /// Storage is unreachable; calls are rejected until it comes back.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".into(),
        }
    }
}
