use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{queue_store::QueueStore, storage::StorageResult},
    state::SharedState,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Doubling delay between connection attempts, capped at [`MAX_BACKOFF`].
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_BACKOFF,
        }
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
    }
}

/// Own the storage connection for the lifetime of the process.
///
/// Dials the backend with exponential backoff, installs the store into the
/// shared state and watches its health at the configured cadence. A store
/// whose connection cannot be recovered is uninstalled so request handlers
/// answer with 503 instead of timing out against a dead backend, and the
/// dial loop starts over.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = StorageResult<Arc<dyn QueueStore>>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                info!("storage connection established");
                state.install_queue_store(store.clone()).await;
                backoff = Backoff::new();

                watch_health(&state, store.as_ref()).await;

                warn!("storage connection is beyond recovery; dropping the store");
                state.clear_queue_store().await;
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }

        backoff.wait().await;
    }
}

/// Ping the store at the configured cadence, flipping the degraded flag as
/// the connection comes and goes. Returns once reconnecting has been given
/// up on.
async fn watch_health(state: &SharedState, store: &dyn QueueStore) {
    let cadence = state.config().health_poll_interval;

    loop {
        sleep(cadence).await;

        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true).await;

                if !redial(store).await {
                    return;
                }

                info!("storage reconnected; leaving degraded mode");
                state.update_degraded(false).await;
            }
        }
    }
}

/// Bounded reconnect attempts with doubling delays; true when one succeeds.
async fn redial(store: &dyn QueueStore) -> bool {
    let mut backoff = Backoff::new();

    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                backoff.wait().await;
            }
        }
    }

    warn!("exhausted storage reconnect attempts");
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{
                CallEntity, CounterEntity, NewCall, NewCounter, NewOrganization,
                OrganizationEntity,
            },
            queue_store::{CallWatch, memory::MemoryQueueStore},
            storage::StorageError,
        },
        state::AppState,
    };

    fn dial_error() -> StorageError {
        StorageError::unavailable("dial failed", std::io::Error::other("connection refused"))
    }

    /// Store whose connection dies after install: health checks fail until a
    /// reconnect has succeeded, and reconnects only succeed when the script
    /// allows recovery. Everything else delegates to an in-memory store.
    #[derive(Clone)]
    struct LostConnectionStore {
        inner: MemoryQueueStore,
        recoverable: bool,
        reconnects: Arc<AtomicUsize>,
    }

    impl LostConnectionStore {
        fn new(recoverable: bool) -> Self {
            Self {
                inner: MemoryQueueStore::new(),
                recoverable,
                reconnects: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl QueueStore for LostConnectionStore {
        fn insert_call(&self, call: NewCall) -> BoxFuture<'static, StorageResult<CallEntity>> {
            self.inner.insert_call(call)
        }

        fn latest_call(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
            self.inner.latest_call(organization_id)
        }

        fn latest_sequential_call(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<CallEntity>>> {
            self.inner.latest_sequential_call(organization_id)
        }

        fn watch_calls(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<CallWatch>> {
            self.inner.watch_calls(organization_id)
        }

        fn find_organization_by_owner(
            &self,
            owner_email: String,
        ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
            self.inner.find_organization_by_owner(owner_email)
        }

        fn create_organization(
            &self,
            organization: NewOrganization,
        ) -> BoxFuture<'static, StorageResult<OrganizationEntity>> {
            self.inner.create_organization(organization)
        }

        fn update_max_count(
            &self,
            organization_id: Uuid,
            max_count: u32,
        ) -> BoxFuture<'static, StorageResult<Option<OrganizationEntity>>> {
            self.inner.update_max_count(organization_id, max_count)
        }

        fn list_active_counters(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<CounterEntity>>> {
            self.inner.list_active_counters(organization_id)
        }

        fn find_counter(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
            self.inner.find_counter(id)
        }

        fn insert_counter(
            &self,
            counter: NewCounter,
        ) -> BoxFuture<'static, StorageResult<CounterEntity>> {
            self.inner.insert_counter(counter)
        }

        fn rename_counter(
            &self,
            id: Uuid,
            name: String,
        ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
            self.inner.rename_counter(id, name)
        }

        fn deactivate_counter(
            &self,
            id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<CounterEntity>>> {
            self.inner.deactivate_counter(id)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let healthy = self.reconnects.load(Ordering::SeqCst) > 0;
            Box::pin(async move {
                if healthy {
                    Ok(())
                } else {
                    Err(dial_error())
                }
            })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            let recoverable = self.recoverable;
            let reconnects = self.reconnects.clone();
            Box::pin(async move {
                if recoverable {
                    reconnects.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                } else {
                    Err(dial_error())
                }
            })
        }
    }

    fn supervise(state: SharedState, store: LostConnectionStore) {
        let dials = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run(state, move || {
            let store = store.clone();
            let dial = dials.fetch_add(1, Ordering::SeqCst);
            async move {
                if dial == 0 {
                    Ok(Arc::new(store) as Arc<dyn QueueStore>)
                } else {
                    Err(dial_error())
                }
            }
        }));
    }

    async fn wait_until(deadline: Duration, predicate: impl AsyncFn() -> bool) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if predicate().await {
                return true;
            }
            sleep(Duration::from_millis(20)).await;
        }
        predicate().await
    }

    #[tokio::test(start_paused = true)]
    async fn an_unrecoverable_store_is_dropped() {
        let state = AppState::new(AppConfig::default());
        let store = LostConnectionStore::new(false);
        supervise(state.clone(), store);

        let watched = state.clone();
        assert!(
            wait_until(Duration::from_secs(120), async || {
                watched.is_degraded() && watched.queue_store().await.is_none()
            })
            .await
        );
        assert!(state.require_queue_store().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn a_recovered_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        let store = LostConnectionStore::new(true);
        let reconnects = store.reconnects.clone();
        supervise(state.clone(), store);

        let watched = state.clone();
        let seen = reconnects.clone();
        assert!(
            wait_until(Duration::from_secs(120), async || {
                seen.load(Ordering::SeqCst) > 0 && !watched.is_degraded()
            })
            .await
        );
        assert_eq!(reconnects.load(Ordering::SeqCst), 1);
        assert!(state.queue_store().await.is_some());
        assert!(state.require_queue_store().await.is_ok());
    }
}
