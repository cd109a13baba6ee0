use std::{sync::Arc, time::SystemTime};

use futures::{StreamExt, TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::{FullDocumentType, IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoCallDocument, MongoCounterDocument, MongoOrganizationDocument, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    models::{
        CallEntity, CallKind, CounterEntity, NewCall, NewCounter, NewOrganization,
        OrganizationEntity,
    },
    queue_store::{CallWatch, QueueStore},
    storage::StorageResult,
};

const CALL_COLLECTION_NAME: &str = "calls";
const COUNTER_COLLECTION_NAME: &str = "counters";
const ORGANIZATION_COLLECTION_NAME: &str = "organizations";

/// [`QueueStore`] backed by MongoDB.
///
/// The event feed rides on collection change streams, so the deployment must
/// run a replica set (a single-node one is enough).
#[derive(Clone)]
pub struct MongoQueueStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoQueueStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // Latest-call queries sort by recency within one organization.
        let calls = database.collection::<MongoCallDocument>(CALL_COLLECTION_NAME);
        for (keys, name, index_name) in [
            (
                doc! {"organization_id": 1, "created_at": -1},
                "organization_id,created_at",
                "call_recency_idx",
            ),
            (
                doc! {"organization_id": 1, "kind": 1, "created_at": -1},
                "organization_id,kind,created_at",
                "call_cursor_idx",
            ),
        ] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(index_name.into())).build())
                .build();
            calls
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: CALL_COLLECTION_NAME,
                    index: name,
                    source,
                })?;
        }

        let counters = database.collection::<MongoCounterDocument>(COUNTER_COLLECTION_NAME);
        let counter_index = IndexModel::builder()
            .keys(doc! {"organization_id": 1, "active": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("counter_org_idx".to_owned()))
                    .build(),
            )
            .build();
        counters
            .create_index(counter_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: COUNTER_COLLECTION_NAME,
                index: "organization_id,active",
                source,
            })?;

        let organizations =
            database.collection::<MongoOrganizationDocument>(ORGANIZATION_COLLECTION_NAME);
        let owner_index = IndexModel::builder()
            .keys(doc! {"owner_email": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("organization_owner_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        organizations
            .create_index(owner_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ORGANIZATION_COLLECTION_NAME,
                index: "owner_email",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn call_collection(&self) -> Collection<MongoCallDocument> {
        self.database()
            .await
            .collection::<MongoCallDocument>(CALL_COLLECTION_NAME)
    }

    async fn counter_collection(&self) -> Collection<MongoCounterDocument> {
        self.database()
            .await
            .collection::<MongoCounterDocument>(COUNTER_COLLECTION_NAME)
    }

    async fn organization_collection(&self) -> Collection<MongoOrganizationDocument> {
        self.database()
            .await
            .collection::<MongoOrganizationDocument>(ORGANIZATION_COLLECTION_NAME)
    }

    async fn insert_call(&self, call: NewCall) -> MongoResult<CallEntity> {
        let organization_id = call.organization_id;
        let entity = CallEntity {
            id: Uuid::new_v4(),
            number: call.number,
            counter_id: call.counter_id,
            counter_name: call.counter_name,
            organization_id,
            kind: call.kind,
            created_at: SystemTime::now(),
        };

        let document: MongoCallDocument = entity.clone().into();
        self.call_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::InsertCall {
                organization_id,
                source,
            })?;

        Ok(entity)
    }

    async fn latest_call_where(
        &self,
        organization_id: Uuid,
        kind: Option<CallKind>,
    ) -> MongoResult<Option<CallEntity>> {
        let mut filter = doc! {"organization_id": uuid_as_binary(organization_id)};
        if let Some(CallKind::Sequential) = kind {
            filter.insert("kind", "sequential");
        } else if let Some(CallKind::Specific) = kind {
            filter.insert("kind", "specific");
        }

        let document = self
            .call_collection()
            .await
            .find_one(filter)
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::LatestCall {
                organization_id,
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn watch_calls(&self, organization_id: Uuid) -> MongoResult<CallWatch> {
        let collection = self.call_collection().await;

        let stream = collection
            .watch()
            .pipeline([doc! {"$match": {
                "operationType": {"$in": ["insert", "update", "replace"]},
                "fullDocument.organization_id": uuid_as_binary(organization_id),
            }}])
            .full_document(FullDocumentType::UpdateLookup)
            .await
            .map_err(|source| MongoDaoError::WatchCalls {
                organization_id,
                source,
            })?;

        let watch = stream
            .filter_map(move |event| async move {
                match event {
                    Ok(event) => event
                        .full_document
                        .map(|document| Ok(CallEntity::from(document))),
                    Err(source) => Some(Err(MongoDaoError::WatchCalls {
                        organization_id,
                        source,
                    }
                    .into())),
                }
            })
            .boxed();

        Ok(watch)
    }

    async fn find_organization_by_owner(
        &self,
        owner_email: String,
    ) -> MongoResult<Option<OrganizationEntity>> {
        let document = self
            .organization_collection()
            .await
            .find_one(doc! {"owner_email": owner_email})
            .await
            .map_err(|source| MongoDaoError::LoadOrganization { source })?;

        Ok(document.map(Into::into))
    }

    async fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> MongoResult<OrganizationEntity> {
        let now = SystemTime::now();
        let entity = OrganizationEntity {
            id: Uuid::new_v4(),
            name: organization.name,
            owner_email: organization.owner_email,
            max_count: organization.max_count,
            created_at: now,
            updated_at: now,
        };

        let document: MongoOrganizationDocument = entity.clone().into();
        self.organization_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveOrganization {
                id: entity.id,
                source,
            })?;

        Ok(entity)
    }

    async fn update_max_count(
        &self,
        organization_id: Uuid,
        max_count: u32,
    ) -> MongoResult<Option<OrganizationEntity>> {
        let document = self
            .organization_collection()
            .await
            .find_one_and_update(
                doc_id(organization_id),
                doc! {"$set": {
                    "max_count": max_count,
                    "updated_at": DateTime::now(),
                }},
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveOrganization {
                id: organization_id,
                source,
            })?;

        Ok(document.map(Into::into))
    }

    async fn list_active_counters(
        &self,
        organization_id: Uuid,
    ) -> MongoResult<Vec<CounterEntity>> {
        let documents: Vec<MongoCounterDocument> = self
            .counter_collection()
            .await
            .find(doc! {
                "organization_id": uuid_as_binary(organization_id),
                "active": true,
            })
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListCounters {
                organization_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListCounters {
                organization_id,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_counter(&self, id: Uuid) -> MongoResult<Option<CounterEntity>> {
        let document = self
            .counter_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadCounter { source })?;

        Ok(document.map(Into::into))
    }

    async fn insert_counter(&self, counter: NewCounter) -> MongoResult<CounterEntity> {
        let now = SystemTime::now();
        let entity = CounterEntity {
            id: Uuid::new_v4(),
            name: counter.name,
            organization_id: counter.organization_id,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let document: MongoCounterDocument = entity.clone().into();
        self.counter_collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveCounter {
                id: entity.id,
                source,
            })?;

        Ok(entity)
    }

    async fn counter_update(
        &self,
        id: Uuid,
        update: mongodb::bson::Document,
    ) -> MongoResult<Option<CounterEntity>> {
        let document = self
            .counter_collection()
            .await
            .find_one_and_update(doc_id(id), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveCounter { id, source })?;

        Ok(document.map(Into::into))
    }
}

impl QueueStore for MongoQueueStore {
    fn insert_call(&self, call: NewCall) -> BoxFuture<'static, StorageResult<CallEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_call(call).await.map_err(Into::into) })
    }

    fn latest_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .latest_call_where(organization_id, None)
                .await
                .map_err(Into::into)
        })
    }

    fn latest_sequential_call(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .latest_call_where(organization_id, Some(CallKind::Sequential))
                .await
                .map_err(Into::into)
        })
    }

    fn watch_calls(&self, organization_id: Uuid) -> BoxFuture<'static, StorageResult<CallWatch>> {
        let store = self.clone();
        Box::pin(async move { store.watch_calls(organization_id).await.map_err(Into::into) })
    }

    fn find_organization_by_owner(
        &self,
        owner_email: String,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_organization_by_owner(owner_email)
                .await
                .map_err(Into::into)
        })
    }

    fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> BoxFuture<'static, StorageResult<OrganizationEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_organization(organization)
                .await
                .map_err(Into::into)
        })
    }

    fn update_max_count(
        &self,
        organization_id: Uuid,
        max_count: u32,
    ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_max_count(organization_id, max_count)
                .await
                .map_err(Into::into)
        })
    }

    fn list_active_counters(
        &self,
        organization_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_active_counters(organization_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_counter(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_counter(id).await.map_err(Into::into) })
    }

    fn insert_counter(
        &self,
        counter: NewCounter,
    ) -> BoxFuture<'static, StorageResult<CounterEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_counter(counter).await.map_err(Into::into) })
    }

    fn rename_counter(
        &self,
        id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .counter_update(
                    id,
                    doc! {"$set": {"name": name, "updated_at": DateTime::now()}},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn deactivate_counter(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .counter_update(
                    id,
                    doc! {"$set": {"active": false, "updated_at": DateTime::now()}},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
