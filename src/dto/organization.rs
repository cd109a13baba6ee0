use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::OrganizationEntity;
use crate::dto::format_system_time;

#[derive(Debug, Deserialize, Validate, ToSchema)]
/// Request body for updating organization settings.
pub struct UpdateOrganizationRequest {
    /// New ticket ceiling; the sequence wraps back to 1 past this number.
    #[validate(range(min = 1))]
    pub max_count: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public view of the operator's organization.
pub struct OrganizationSummary {
    /// Stable identity of the organization.
    pub id: Uuid,
    /// Organization display name.
    pub name: String,
    /// Email address of the owning operator.
    pub owner_email: String,
    /// Ticket ceiling; sequential calls wrap back to 1 past this number.
    pub max_count: u32,
    /// RFC 3339 timestamp of creation.
    pub created_at: String,
}

impl From<OrganizationEntity> for OrganizationSummary {
    fn from(organization: OrganizationEntity) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            owner_email: organization.owner_email,
            max_count: organization.max_count,
            created_at: format_system_time(organization.created_at),
        }
    }
}
