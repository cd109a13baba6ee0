use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Counter management payloads.
pub mod counter;
/// Health endpoint payloads.
pub mod health;
/// Organization settings payloads.
pub mod organization;
/// Queue calling payloads.
pub mod queue;
/// Server-sent event payloads.
pub mod sse;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
