use axum::Router;

use crate::state::SharedState;

/// Counter management endpoints.
pub mod counters;
/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check endpoint.
pub mod health;
/// Organization settings endpoints.
pub mod organization;
/// Ticket calling endpoints.
pub mod queue;
/// Display event stream endpoint.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(queue::router())
        .merge(counters::router())
        .merge(organization::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
