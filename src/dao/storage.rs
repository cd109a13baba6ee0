use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
///
/// Read and write failures are kept apart so callers can tell a lost fetch
/// (the next poll tick converges) from a lost insert (surfaced to the
/// operator verbatim).
#[derive(Debug, Error)]
pub enum StorageError {
    /// A query failed to complete.
    #[error("storage read failed: {message}")]
    Read {
        /// Human-readable description of the failed query.
        message: String,
        /// Backend error that caused the failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// An insert or update failed to complete.
    #[error("storage write failed: {message}")]
    Write {
        /// Human-readable description of the failed statement.
        message: String,
        /// Backend error that caused the failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend cannot be reached at all.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable description of the connectivity problem.
        message: String,
        /// Backend error that caused the failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct a read error from any backend failure.
    pub fn read(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Read {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Construct a write error from any backend failure.
    pub fn write(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Write {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
