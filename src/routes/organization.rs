use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dto::organization::{OrganizationSummary, UpdateOrganizationRequest},
    error::AppError,
    services::{organization_service, session::Session},
    state::SharedState,
};

/// Routes exposing the operator's organization settings.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/organization", get(get_organization))
        .route("/organization", put(update_organization))
}

/// Return the operator's organization, creating it on first access.
#[utoipa::path(
    get,
    path = "/organization",
    tag = "organization",
    responses(
        (status = 200, description = "Organization settings", body = OrganizationSummary),
        (status = 401, description = "Missing operator identity")
    )
)]
pub async fn get_organization(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<OrganizationSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    Ok(Json(organization.into()))
}

/// Update the organization's ticket ceiling.
#[utoipa::path(
    put,
    path = "/organization",
    tag = "organization",
    request_body = UpdateOrganizationRequest,
    responses(
        (status = 200, description = "Settings updated", body = OrganizationSummary),
        (status = 400, description = "Invalid ceiling")
    )
)]
pub async fn update_organization(
    State(state): State<SharedState>,
    session: Session,
    Valid(Json(payload)): Valid<Json<UpdateOrganizationRequest>>,
) -> Result<Json<OrganizationSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let updated =
        organization_service::update_max_count(&state, organization.id, payload.max_count).await?;
    Ok(Json(updated.into()))
}
