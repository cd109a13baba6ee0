use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::counter::{
        CounterListResponse, CounterSummary, CreateCounterRequest, RenameCounterRequest,
    },
    error::AppError,
    services::{counter_service, organization_service, session::Session},
    state::SharedState,
};

/// Routes managing the organization's counters.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/counters", get(list_counters))
        .route("/counters", post(create_counter))
        .route("/counters/{id}", put(rename_counter))
        .route("/counters/{id}", delete(deactivate_counter))
}

/// List the organization's active counters.
#[utoipa::path(
    get,
    path = "/counters",
    tag = "counters",
    responses(
        (status = 200, description = "Active counters", body = CounterListResponse),
        (status = 401, description = "Missing operator identity")
    )
)]
pub async fn list_counters(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<CounterListResponse>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let counters = counter_service::list(&state, organization.id).await?;
    Ok(Json(CounterListResponse {
        counters: counters.into_iter().map(Into::into).collect(),
    }))
}

/// Create a counter for the organization.
#[utoipa::path(
    post,
    path = "/counters",
    tag = "counters",
    request_body = CreateCounterRequest,
    responses(
        (status = 200, description = "Counter created", body = CounterSummary),
        (status = 400, description = "Invalid counter name")
    )
)]
pub async fn create_counter(
    State(state): State<SharedState>,
    session: Session,
    Valid(Json(payload)): Valid<Json<CreateCounterRequest>>,
) -> Result<Json<CounterSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let counter = counter_service::create(&state, organization.id, &payload.name).await?;
    Ok(Json(counter.into()))
}

/// Rename one of the organization's counters.
#[utoipa::path(
    put,
    path = "/counters/{id}",
    tag = "counters",
    params(("id" = Uuid, Path, description = "Identifier of the counter to rename")),
    request_body = RenameCounterRequest,
    responses(
        (status = 200, description = "Counter renamed", body = CounterSummary),
        (status = 404, description = "Unknown counter")
    )
)]
pub async fn rename_counter(
    State(state): State<SharedState>,
    session: Session,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<RenameCounterRequest>>,
) -> Result<Json<CounterSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let counter = counter_service::rename(&state, organization.id, id, &payload.name).await?;
    Ok(Json(counter.into()))
}

/// Deactivate one of the organization's counters.
#[utoipa::path(
    delete,
    path = "/counters/{id}",
    tag = "counters",
    params(("id" = Uuid, Path, description = "Identifier of the counter to deactivate")),
    responses(
        (status = 200, description = "Counter deactivated", body = CounterSummary),
        (status = 404, description = "Unknown counter")
    )
)]
pub async fn deactivate_counter(
    State(state): State<SharedState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<CounterSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let counter = counter_service::deactivate(&state, organization.id, id).await?;
    Ok(Json(counter.into()))
}
