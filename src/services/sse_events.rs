use tracing::warn;

use crate::{
    dao::models::CallEntity,
    dto::sse::{CallAnnouncedEvent, Handshake, ServerEvent, SystemStatus},
    state::SseHub,
};

const EVENT_CALL_ANNOUNCED: &str = "call.announced";
const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast that `call` became the organization's latest announced call.
pub fn broadcast_call_announced(hub: &SseHub, call: &CallEntity) {
    let payload = CallAnnouncedEvent {
        call: call.clone().into(),
    };
    match ServerEvent::json(Some(EVENT_CALL_ANNOUNCED.to_string()), &payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(error = %err, "failed to serialize call announcement"),
    }
}

/// Build the degraded-mode status event fanned out to every display stream.
pub fn system_status_event(degraded: bool) -> Option<ServerEvent> {
    let payload = SystemStatus { degraded };
    match ServerEvent::json(Some(EVENT_SYSTEM_STATUS.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize system status event");
            None
        }
    }
}

/// Build the greeting sent to a display right after it subscribes, carrying
/// the current snapshot so the display renders without waiting for a call.
pub fn handshake_event(degraded: bool, last_call: Option<CallEntity>) -> Option<ServerEvent> {
    let payload = Handshake {
        stream: "display".to_string(),
        message: "subscribed to the queue display stream".to_string(),
        degraded,
        last_call: last_call.map(Into::into),
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize handshake event");
            None
        }
    }
}
