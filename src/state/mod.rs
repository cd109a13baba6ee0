/// Merge core holding the latest observed call.
pub mod call_slot;
mod sse;
/// Live state synchronizer feeding the per-organization snapshot.
pub mod sync;

use std::sync::{Arc, Mutex};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{models::CallEntity, queue_store::QueueStore},
    error::ServiceError,
    services::sse_events,
};

pub use self::call_slot::CallSlot;
pub use self::sse::SseHub;

/// Cheaply clonable handle to the central application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the storage handle and the live queue
/// contexts.
pub struct AppState {
    config: AppConfig,
    queue_store: RwLock<Option<Arc<dyn QueueStore>>>,
    contexts: DashMap<Uuid, Arc<QueueContext>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            queue_store: RwLock::new(None),
            contexts: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current queue store, if one is installed.
    pub async fn queue_store(&self) -> Option<Arc<dyn QueueStore>> {
        let guard = self.queue_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the queue store or fail when running in degraded mode.
    ///
    /// The degraded flag is checked first: a store may still be installed
    /// while the supervisor retries a lost connection, and handing it out
    /// would only trade a clear 503 for a backend timeout.
    pub async fn require_queue_store(&self) -> Result<Arc<dyn QueueStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.queue_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new queue store implementation and leave degraded mode.
    pub async fn install_queue_store(&self, store: Arc<dyn QueueStore>) {
        {
            let mut guard = self.queue_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current queue store and enter degraded mode.
    pub async fn clear_queue_store(&self) {
        {
            let mut guard = self.queue_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag and tell connected displays when it changes.
    pub async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);

        if let Some(event) = sse_events::system_status_event(value) {
            for context in self.contexts.iter() {
                context.hub().broadcast(event.clone());
            }
        }
    }

    /// Get or create the live context for an organization.
    ///
    /// Creating a context spawns its synchronizer; the context lives until
    /// [`AppState::drop_context`] or [`AppState::shutdown_contexts`].
    pub fn context(self: &Arc<Self>, organization_id: Uuid) -> Arc<QueueContext> {
        match self.contexts.entry(organization_id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(vacant) => {
                let (context, shutdown) =
                    QueueContext::new(organization_id, self.config.sse_capacity);
                let task = tokio::spawn(sync::run_live_sync(
                    self.clone(),
                    context.clone(),
                    shutdown,
                ));
                context.set_sync_task(task);
                vacant.insert(context.clone());
                context
            }
        }
    }

    /// Tear down one organization context, stopping its feeds.
    pub fn drop_context(&self, organization_id: Uuid) {
        if let Some((_, context)) = self.contexts.remove(&organization_id) {
            context.shutdown();
        }
    }

    /// Tear down every live context; used during graceful shutdown.
    pub fn shutdown_contexts(&self) {
        for entry in self.contexts.iter() {
            entry.value().shutdown();
        }
        self.contexts.clear();
    }
}

/// Live queue state for one organization: the latest-call snapshot, the SSE
/// hub feeding displays, and the synchronizer task keeping both fresh.
pub struct QueueContext {
    organization_id: Uuid,
    slot: CallSlot,
    hub: SseHub,
    shutdown: watch::Sender<bool>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl QueueContext {
    fn new(organization_id: Uuid, sse_capacity: usize) -> (Arc<Self>, watch::Receiver<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = Arc::new(Self {
            organization_id,
            slot: CallSlot::new(),
            hub: SseHub::new(sse_capacity),
            shutdown: shutdown_tx,
            sync_task: Mutex::new(None),
        });
        (context, shutdown_rx)
    }

    /// Organization this context belongs to.
    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    /// The currently held snapshot, if any call has been observed.
    pub fn last_call(&self) -> Option<CallEntity> {
        self.slot.last_call()
    }

    /// Broadcast hub for the organization's display stream.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Offer a call to the snapshot; the single entry point for every update
    /// source (change feed, poll tick, optimistic write).
    ///
    /// Broadcasts one `call.announced` event when the snapshot moves, so
    /// displays see each distinct call exactly once.
    pub fn observe(&self, call: CallEntity) -> bool {
        if self.slot.apply(call.clone()) {
            sse_events::broadcast_call_announced(&self.hub, &call);
            true
        } else {
            false
        }
    }

    /// Stop the synchronizer: the shutdown flag breaks the loop and the abort
    /// drops any in-flight fetch so late results cannot land in the slot.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.take_sync_task() {
            task.abort();
        }
    }

    fn set_sync_task(&self, task: JoinHandle<()>) {
        if let Ok(mut guard) = self.sync_task.lock() {
            *guard = Some(task);
        }
    }

    fn take_sync_task(&self) -> Option<JoinHandle<()>> {
        self.sync_task.lock().ok().and_then(|mut guard| guard.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::queue_store::memory::MemoryQueueStore;

    #[tokio::test]
    async fn degraded_flag_tracks_explicit_updates() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        state.install_queue_store(Arc::new(MemoryQueueStore::new())).await;
        assert!(!state.is_degraded());

        // An installed store does not mask a reported outage.
        state.update_degraded(true).await;
        assert!(state.is_degraded());
        assert!(state.require_queue_store().await.is_err());

        state.update_degraded(false).await;
        assert!(!state.is_degraded());
        assert!(state.require_queue_store().await.is_ok());
    }

    #[tokio::test]
    async fn clearing_the_store_enters_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        state.install_queue_store(Arc::new(MemoryQueueStore::new())).await;

        state.clear_queue_store().await;
        assert!(state.is_degraded());
        assert!(state.queue_store().await.is_none());
        assert!(state.require_queue_store().await.is_err());
    }
}
