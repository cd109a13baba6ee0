use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::queue::CallSummary;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name, or `None` for the default `message` event.
    pub event: Option<String>,
    /// Serialized event payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to a display when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`display`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Snapshot of the last announced call, if any exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call: Option<CallSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether storage is currently unreachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever a new call becomes the organization's latest.
pub struct CallAnnouncedEvent {
    /// The call that was just announced.
    pub call: CallSummary,
}
