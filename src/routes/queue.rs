use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::queue::{CallNextRequest, CallSpecificRequest, CallSummary, LastCallResponse},
    error::AppError,
    services::{organization_service, queue_service, session::Session},
    state::SharedState,
};

/// Routes issuing and reading queue calls.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/queue/last", get(last_call))
        .route("/queue/next", post(call_next))
        .route("/queue/call", post(call_specific))
}

/// Return the most recent call of the operator's organization.
#[utoipa::path(
    get,
    path = "/queue/last",
    tag = "queue",
    responses(
        (status = 200, description = "Latest call, if any", body = LastCallResponse),
        (status = 401, description = "Missing operator identity"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn last_call(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Json<LastCallResponse>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let call = queue_service::last_call(&state, organization.id).await?;
    Ok(Json(LastCallResponse {
        last_call: call.map(Into::into),
    }))
}

/// Call the next sequential ticket from the given counter.
#[utoipa::path(
    post,
    path = "/queue/next",
    tag = "queue",
    request_body = CallNextRequest,
    responses(
        (status = 200, description = "Ticket called", body = CallSummary),
        (status = 409, description = "No counter selected"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn call_next(
    State(state): State<SharedState>,
    session: Session,
    Json(payload): Json<CallNextRequest>,
) -> Result<Json<CallSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let call = queue_service::call_next(&state, &organization, payload.counter_id).await?;
    Ok(Json(call.into()))
}

/// Call one explicit ticket number from the given counter.
#[utoipa::path(
    post,
    path = "/queue/call",
    tag = "queue",
    request_body = CallSpecificRequest,
    responses(
        (status = 200, description = "Ticket called", body = CallSummary),
        (status = 400, description = "Number out of range"),
        (status = 409, description = "No counter selected"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn call_specific(
    State(state): State<SharedState>,
    session: Session,
    Valid(Json(payload)): Valid<Json<CallSpecificRequest>>,
) -> Result<Json<CallSummary>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let call = queue_service::call_specific(
        &state,
        &organization,
        payload.counter_id,
        payload.number,
    )
    .await?;
    Ok(Json(call.into()))
}
