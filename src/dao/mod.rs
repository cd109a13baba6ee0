/// Database model definitions.
pub mod models;
/// Call, counter, and organization storage operations.
pub mod queue_store;
/// Storage abstraction layer for database operations.
pub mod storage;
