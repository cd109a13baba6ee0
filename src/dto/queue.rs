use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{CallEntity, CallKind};
use crate::dto::format_system_time;

#[derive(Debug, Deserialize, ToSchema)]
/// Request body for calling the next sequential ticket.
pub struct CallNextRequest {
    /// Counter the operator is working from; required to issue a call.
    pub counter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Request body for calling one explicit ticket number.
pub struct CallSpecificRequest {
    /// Counter the operator is working from; required to issue a call.
    pub counter_id: Option<Uuid>,
    /// Ticket number to announce; must stay within the organization's ceiling.
    #[validate(range(min = 1))]
    pub number: u32,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public view of one queue call.
pub struct CallSummary {
    /// Stable identity of the call.
    pub id: Uuid,
    /// Announced ticket number.
    pub number: u32,
    /// Counter that issued the call.
    pub counter_id: Uuid,
    /// Counter name at the time of the call.
    pub counter_name: String,
    /// Whether the call advanced the sequence or named a specific number.
    pub kind: CallKind,
    /// RFC 3339 timestamp of when the call was made.
    pub called_at: String,
}

impl From<CallEntity> for CallSummary {
    fn from(call: CallEntity) -> Self {
        Self {
            id: call.id,
            number: call.number,
            counter_id: call.counter_id,
            counter_name: call.counter_name,
            kind: call.kind,
            called_at: format_system_time(call.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Latest-call snapshot returned by the queue read endpoint.
pub struct LastCallResponse {
    /// Most recent call for the organization, if any exists.
    pub last_call: Option<CallSummary>,
}
