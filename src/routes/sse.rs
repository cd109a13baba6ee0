use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::{organization_service, session::Session, sse_events, sse_service},
    state::SharedState,
};

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/display", get(display_stream))
}

/// Stream call announcements to a display of the operator's organization.
///
/// The handshake carries the current snapshot so the display renders
/// immediately; afterwards every `call.announced` event is delivered exactly
/// once per distinct call.
#[utoipa::path(
    get,
    path = "/sse/display",
    tag = "sse",
    responses((status = 200, description = "Display SSE stream", content_type = "text/event-stream", body = String))
)]
pub async fn display_stream(
    State(state): State<SharedState>,
    session: Session,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let organization = organization_service::resolve(&state, &session.operator_email).await?;
    let context = state.context(organization.id);

    let receiver = sse_service::subscribe(&context);
    info!(organization_id = %organization.id, "new display SSE connection");

    // The handshake is addressed to this connection alone; displays that are
    // already watching keep their current state.
    let handshake = sse_events::handshake_event(state.is_degraded(), context.last_call());

    Ok(sse_service::to_sse_stream(receiver, organization.id, handshake))
}
