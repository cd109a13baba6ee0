use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Origin of a call, mirrored by the `kind` column of the calls table.
///
/// Only sequential calls move the organization-wide ticket cursor; specific
/// calls are announced without touching it, so operators can reissue or
/// recall a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Issued by call-next through the allocator.
    Sequential,
    /// Issued by call-specific with an operator-chosen number.
    Specific,
}

/// One immutable record of a ticket number announced at a counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallEntity {
    /// Stable identifier for the call.
    pub id: Uuid,
    /// Announced ticket number (1..=max_count of the organization).
    pub number: u32,
    /// Counter that announced the number.
    pub counter_id: Uuid,
    /// Counter name captured at call time, unaffected by later renames.
    pub counter_name: String,
    /// Organization the call belongs to.
    pub organization_id: Uuid,
    /// Whether the call came from the allocator or an operator.
    pub kind: CallKind,
    /// Creation timestamp; calls are totally ordered by it per organization.
    pub created_at: SystemTime,
}

/// Payload used to insert a new call row; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCall {
    /// Ticket number to announce.
    pub number: u32,
    /// Counter announcing the number.
    pub counter_id: Uuid,
    /// Denormalized counter name.
    pub counter_name: String,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Origin of the call.
    pub kind: CallKind,
}

/// A named service point ("gabinete") that can issue calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterEntity {
    /// Stable identifier for the counter.
    pub id: Uuid,
    /// Display name shown on the public display next to the called number.
    pub name: String,
    /// Organization the counter belongs to.
    pub organization_id: Uuid,
    /// Soft-delete flag; deactivated counters keep their call history.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the counter was renamed or deactivated.
    pub updated_at: SystemTime,
}

/// Payload used to insert a new counter; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCounter {
    /// Display name for the counter.
    pub name: String,
    /// Owning organization.
    pub organization_id: Uuid,
}

/// Tenant scoping counters, calls, and the max-count configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationEntity {
    /// Stable identifier for the organization.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// E-mail of the owning operator account; one organization per owner.
    pub owner_email: String,
    /// Upper bound for ticket numbers before the sequence wraps to 1.
    pub max_count: u32,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last settings change.
    pub updated_at: SystemTime,
}

/// Payload used to insert a new organization; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    /// Display name.
    pub name: String,
    /// Owner account e-mail.
    pub owner_email: String,
    /// Initial ticket-number bound.
    pub max_count: u32,
}
