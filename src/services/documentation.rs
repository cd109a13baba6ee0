use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for QueueFlow Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::queue::last_call,
        crate::routes::queue::call_next,
        crate::routes::queue::call_specific,
        crate::routes::counters::list_counters,
        crate::routes::counters::create_counter,
        crate::routes::counters::rename_counter,
        crate::routes::counters::deactivate_counter,
        crate::routes::organization::get_organization,
        crate::routes::organization::update_organization,
        crate::routes::sse::display_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::queue::CallNextRequest,
            crate::dto::queue::CallSpecificRequest,
            crate::dto::queue::CallSummary,
            crate::dto::queue::LastCallResponse,
            crate::dto::counter::CreateCounterRequest,
            crate::dto::counter::RenameCounterRequest,
            crate::dto::counter::CounterSummary,
            crate::dto::counter::CounterListResponse,
            crate::dto::organization::UpdateOrganizationRequest,
            crate::dto::organization::OrganizationSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::CallAnnouncedEvent,
            crate::dao::models::CallKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "queue", description = "Ticket calling operations"),
        (name = "counters", description = "Counter management"),
        (name = "organization", description = "Organization settings"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
