/// Counter management operations.
pub mod counter_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Organization resolution and settings.
pub mod organization_service;
/// Ticket allocation and call issuing.
pub mod queue_service;
/// Operator identity extraction.
pub mod session;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
