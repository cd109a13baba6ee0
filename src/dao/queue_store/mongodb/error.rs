use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB queue store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert call for organization `{organization_id}`")]
    InsertCall {
        organization_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to fetch the latest call for organization `{organization_id}`")]
    LatestCall {
        organization_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("call change stream failed for organization `{organization_id}`")]
    WatchCalls {
        organization_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load organization")]
    LoadOrganization {
        #[source]
        source: MongoError,
    },
    #[error("failed to save organization `{id}`")]
    SaveOrganization {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load counter")]
    LoadCounter {
        #[source]
        source: MongoError,
    },
    #[error("failed to save counter `{id}`")]
    SaveCounter {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list counters for organization `{organization_id}`")]
    ListCounters {
        organization_id: Uuid,
        #[source]
        source: MongoError,
    },
}
