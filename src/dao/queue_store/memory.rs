use std::{sync::Arc, time::SystemTime};

use futures::{StreamExt, future::BoxFuture};
use indexmap::IndexMap;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use crate::dao::{
    models::{
        CallEntity, CallKind, CounterEntity, NewCall, NewCounter, NewOrganization,
        OrganizationEntity,
    },
    queue_store::{CallWatch, QueueStore},
    storage::StorageResult,
};

const CALL_EVENT_CAPACITY: usize = 64;

/// In-memory [`QueueStore`] keeping all tables behind one lock.
///
/// Backs the test suite and `QUEUEFLOW_STORE=memory` runs. The broadcast
/// channel plays the part of the database change feed so the synchronizer
/// exercises the same code paths as against a real backend.
#[derive(Clone)]
pub struct MemoryQueueStore {
    inner: Arc<Inner>,
}

struct Inner {
    tables: RwLock<Tables>,
    call_events: broadcast::Sender<CallEntity>,
}

#[derive(Default)]
struct Tables {
    calls: Vec<CallEntity>,
    counters: IndexMap<Uuid, CounterEntity>,
    organizations: IndexMap<Uuid, OrganizationEntity>,
}

impl MemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (call_events, _receiver) = broadcast::channel(CALL_EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                call_events,
            }),
        }
    }

    async fn latest_call_where(
        &self,
        organization_id: Uuid,
        kind: Option<CallKind>,
    ) -> Option<CallEntity> {
        let tables = self.inner.tables.read().await;
        // Calls are append-only, so the last matching row is the most recent.
        tables
            .calls
            .iter()
            .rev()
            .find(|call| {
                call.organization_id == organization_id
                    && kind.is_none_or(|wanted| call.kind == wanted)
            })
            .cloned()
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStore for MemoryQueueStore {
    fn insert_call(&self, call: NewCall) -> BoxFuture<'static, StorageResult<CallEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let entity = CallEntity {
                id: Uuid::new_v4(),
                number: call.number,
                counter_id: call.counter_id,
                counter_name: call.counter_name,
                organization_id: call.organization_id,
                kind: call.kind,
                created_at: SystemTime::now(),
            };

            {
                let mut tables = store.inner.tables.write().await;
                tables.calls.push(entity.clone());
            }

            // No subscribers is fine; polling still converges.
            let _ = store.inner.call_events.send(entity.clone());
            Ok(entity)
        })
    }

    fn latest_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.latest_call_where(organization_id, None).await) })
    }

    fn latest_sequential_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .latest_call_where(organization_id, Some(CallKind::Sequential))
                .await)
        })
    }

    fn watch_calls(&self, organization_id: Uuid) -> BoxFuture<'static, StorageResult<CallWatch>> {
        let mut receiver = self.inner.call_events.subscribe();
        Box::pin(async move {
            let stream = async_stream::stream! {
                loop {
                    match receiver.recv().await {
                        Ok(call) if call.organization_id == organization_id => yield Ok(call),
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };
            Ok(stream.boxed())
        })
    }

    fn find_organization_by_owner(
        &self,
        owner_email: String,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .organizations
                .values()
                .find(|organization| organization.owner_email == owner_email)
                .cloned())
        })
    }

    fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> BoxFuture<'static, StorageResult<OrganizationEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let now = SystemTime::now();
            let entity = OrganizationEntity {
                id: Uuid::new_v4(),
                name: organization.name,
                owner_email: organization.owner_email,
                max_count: organization.max_count,
                created_at: now,
                updated_at: now,
            };

            let mut tables = store.inner.tables.write().await;
            tables.organizations.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn update_max_count(
        &self,
        organization_id: Uuid,
        max_count: u32,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.tables.write().await;
            let Some(organization) = tables.organizations.get_mut(&organization_id) else {
                return Ok(None);
            };
            organization.max_count = max_count;
            organization.updated_at = SystemTime::now();
            Ok(Some(organization.clone()))
        })
    }

    fn list_active_counters(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .counters
                .values()
                .filter(|counter| counter.organization_id == organization_id && counter.active)
                .cloned()
                .collect())
        })
    }

    fn find_counter(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables.counters.get(&id).cloned())
        })
    }

    fn insert_counter(
        &self,
        counter: NewCounter,
    ) -> BoxFuture<'static, StorageResult<CounterEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let now = SystemTime::now();
            let entity = CounterEntity {
                id: Uuid::new_v4(),
                name: counter.name,
                organization_id: counter.organization_id,
                active: true,
                created_at: now,
                updated_at: now,
            };

            let mut tables = store.inner.tables.write().await;
            tables.counters.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn rename_counter(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.tables.write().await;
            let Some(counter) = tables.counters.get_mut(&id) else {
                return Ok(None);
            };
            counter.name = name;
            counter.updated_at = SystemTime::now();
            Ok(Some(counter.clone()))
        })
    }

    fn deactivate_counter(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.inner.tables.write().await;
            let Some(counter) = tables.counters.get_mut(&id) else {
                return Ok(None);
            };
            counter.active = false;
            counter.updated_at = SystemTime::now();
            Ok(Some(counter.clone()))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
