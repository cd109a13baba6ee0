/// In-memory backend used for tests and storage-less local runs.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend built on change streams.
pub mod mongodb;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::dao::models::{
    CallEntity, CounterEntity, NewCall, NewCounter, NewOrganization, OrganizationEntity,
};
use crate::dao::storage::StorageResult;

/// Stream of call rows delivered by a change subscription scoped to one
/// organization. Dropping the stream releases the subscription.
pub type CallWatch = BoxStream<'static, StorageResult<CallEntity>>;

/// Abstraction over the persistence layer for calls, counters, and
/// organizations.
pub trait QueueStore: Send + Sync {
    /// Insert one call row atomically and return it with id and timestamp set.
    fn insert_call(&self, call: NewCall) -> BoxFuture<'static, StorageResult<CallEntity>>;
    /// Most recent call of any kind for the organization.
    fn latest_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>>;
    /// Most recent sequential call; the allocator cursor ignores specific calls.
    fn latest_sequential_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>>;
    /// Subscribe to call inserts/updates scoped to the organization.
    fn watch_calls(&self, organization_id: Uuid) -> BoxFuture<'static, StorageResult<CallWatch>>;
    /// Fetch the organization owned by the given account, if any.
    fn find_organization_by_owner(
        &self,
        owner_email: String,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>>;
    /// Insert a new organization and return it.
    fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> BoxFuture<'static, StorageResult<OrganizationEntity>>;
    /// Replace the organization's ticket-number bound, returning the updated row.
    fn update_max_count(
        &self,
        organization_id: Uuid,
        max_count: u32,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>>;
    /// Active counters for the organization, in creation order.
    fn list_active_counters(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CounterEntity>>>;
    /// Fetch a counter by id regardless of its active flag.
    fn find_counter(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>>;
    /// Insert a new active counter and return it.
    fn insert_counter(
        &self,
        counter: NewCounter,
    ) -> BoxFuture<'static, StorageResult<CounterEntity>>;
    /// Rename a counter, returning the updated row when it exists.
    fn rename_counter(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>>;
    /// Clear the active flag; the counter and its calls stay on record.
    fn deactivate_counter(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>>;
    /// Cheap connectivity check used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
