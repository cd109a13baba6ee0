mod connection;
mod error;
mod models;
/// Store implementation backed by MongoDB collections and change streams.
pub mod store;

/// Connection settings parsed from a URI or the environment.
pub mod config;

pub use error::MongoDaoError;
pub use store::MongoQueueStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        let message = err.to_string();
        match &err {
            MongoDaoError::InsertCall { .. }
            | MongoDaoError::SaveOrganization { .. }
            | MongoDaoError::SaveCounter { .. } => StorageError::write(message, err),
            MongoDaoError::LatestCall { .. }
            | MongoDaoError::WatchCalls { .. }
            | MongoDaoError::LoadOrganization { .. }
            | MongoDaoError::LoadCounter { .. }
            | MongoDaoError::ListCounters { .. } => StorageError::read(message, err),
            _ => StorageError::unavailable(message, err),
        }
    }
}
