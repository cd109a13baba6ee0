use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{NewOrganization, OrganizationEntity},
    error::ServiceError,
    state::SharedState,
};

/// Resolve the organization owned by `owner_email`, creating it on first
/// access.
///
/// A freshly created organization is named after the local part of the
/// owner's address and starts with the configured default ticket ceiling.
pub async fn resolve(
    state: &SharedState,
    owner_email: &str,
) -> Result<OrganizationEntity, ServiceError> {
    let store = state.require_queue_store().await?;

    if let Some(existing) = store
        .find_organization_by_owner(owner_email.to_string())
        .await?
    {
        return Ok(existing);
    }

    let organization = store
        .create_organization(NewOrganization {
            name: default_name(owner_email),
            owner_email: owner_email.to_string(),
            max_count: state.config().default_max_count,
        })
        .await?;
    info!(organization_id = %organization.id, "created organization on first access");
    Ok(organization)
}

/// Change the organization's ticket ceiling.
///
/// A ceiling below the most recent ticket is allowed; the sequence simply
/// wraps back to 1 on the next call.
pub async fn update_max_count(
    state: &SharedState,
    organization_id: Uuid,
    max_count: u32,
) -> Result<OrganizationEntity, ServiceError> {
    if max_count == 0 {
        return Err(ServiceError::InvalidInput(
            "max_count must be at least 1".into(),
        ));
    }

    let store = state.require_queue_store().await?;
    store
        .update_max_count(organization_id, max_count)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("organization {organization_id}")))
}

fn default_name(owner_email: &str) -> String {
    let local = owner_email.split('@').next().unwrap_or(owner_email).trim();
    if local.is_empty() {
        owner_email.to_string()
    } else {
        local.to_string()
    }
}
