use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::CounterEntity;
use crate::dto::format_system_time;

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Request body for creating a counter.
pub struct CreateCounterRequest {
    /// Display name of the counter, e.g. "Desk 3".
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Request body for renaming a counter.
pub struct RenameCounterRequest {
    /// New display name of the counter.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public view of one counter.
pub struct CounterSummary {
    /// Stable identity of the counter.
    pub id: Uuid,
    /// Display name shown on calls issued from this counter.
    pub name: String,
    /// RFC 3339 timestamp of creation.
    pub created_at: String,
}

impl From<CounterEntity> for CounterSummary {
    fn from(counter: CounterEntity) -> Self {
        Self {
            id: counter.id,
            name: counter.name,
            created_at: format_system_time(counter.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// List of the organization's active counters.
pub struct CounterListResponse {
    /// Active counters, oldest first.
    pub counters: Vec<CounterSummary>,
}
