//! Library crate for queueflow-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Storage models, trait, and backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route handlers.
pub mod routes;
/// Business logic services.
pub mod services;
/// Shared state and live queue contexts.
pub mod state;
