use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{models::CallEntity, queue_store::CallWatch, storage::StorageResult},
    state::{QueueContext, SharedState},
};

/// Drive the live snapshot for one organization until shutdown.
///
/// Two feeds race into the context's slot: the store's change subscription
/// and a fixed-interval poll of the most recent call. The slot's merge rule
/// makes them idempotent with respect to each other, so no ordering between
/// the feeds is assumed. Feed-level errors are logged and swallowed; the next
/// tick converges the snapshot.
pub async fn run_live_sync(
    state: SharedState,
    context: Arc<QueueContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    let organization_id = context.organization_id();

    seed_snapshot(&state, &context).await;

    let mut poll = interval(state.config().poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut feed = subscribe(&state, organization_id).await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = next_feed_item(&mut feed) => match event {
                Some(Ok(call)) => {
                    context.observe(call);
                }
                Some(Err(err)) => {
                    warn!(%organization_id, error = %err, "call change feed failed; resubscribing on the next poll tick");
                    feed = None;
                }
                None => {
                    warn!(%organization_id, "call change feed ended; resubscribing on the next poll tick");
                    feed = None;
                }
            },
            _ = poll.tick() => {
                poll_latest(&state, &context).await;
                // A lost subscription is only retried at poll cadence, so a
                // feed that keeps dying cannot hammer the store; polling
                // keeps the snapshot converging in the meantime.
                if feed.is_none() {
                    feed = subscribe(&state, organization_id).await;
                }
            }
        }
    }

    debug!(%organization_id, "live sync stopped");
}

/// Seed the snapshot with one explicit fetch before either feed is live.
async fn seed_snapshot(state: &SharedState, context: &QueueContext) {
    let organization_id = context.organization_id();
    let Some(store) = state.queue_store().await else {
        warn!(%organization_id, "storage unavailable; snapshot will seed from the first poll");
        return;
    };

    match store.latest_call(organization_id).await {
        Ok(Some(call)) => {
            context.observe(call);
        }
        Ok(None) => {}
        Err(err) => {
            warn!(%organization_id, error = %err, "initial snapshot fetch failed; polling will converge");
        }
    }
}

async fn subscribe(state: &SharedState, organization_id: Uuid) -> Option<CallWatch> {
    let store = state.queue_store().await?;
    match store.watch_calls(organization_id).await {
        Ok(watch) => Some(watch),
        Err(err) => {
            warn!(%organization_id, error = %err, "failed to subscribe to call changes");
            None
        }
    }
}

/// Next item from the change feed, or pending forever while unsubscribed so
/// the poll branch keeps the loop alive.
async fn next_feed_item(feed: &mut Option<CallWatch>) -> Option<StorageResult<CallEntity>> {
    match feed {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn poll_latest(state: &SharedState, context: &QueueContext) {
    let organization_id = context.organization_id();
    let Some(store) = state.queue_store().await else {
        return;
    };

    match store.latest_call(organization_id).await {
        Ok(Some(call)) => {
            context.observe(call);
        }
        Ok(None) => {}
        Err(err) => {
            warn!(%organization_id, error = %err, "poll fetch failed; keeping current snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use futures::{StreamExt, future::BoxFuture};
    use tokio::time::sleep;
    use uuid::Uuid;

    use crate::{
        config::AppConfig,
        dao::{
            models::{
                CallKind, CounterEntity, NewCall, NewCounter, NewOrganization, OrganizationEntity,
            },
            queue_store::{CallWatch, QueueStore, memory::MemoryQueueStore},
            storage::StorageResult,
        },
        state::AppState,
    };

    fn test_config() -> AppConfig {
        AppConfig {
            poll_interval: Duration::from_millis(40),
            ..AppConfig::default()
        }
    }

    fn new_call(organization_id: Uuid, number: u32) -> NewCall {
        NewCall {
            number,
            counter_id: Uuid::new_v4(),
            counter_name: "Desk 1".into(),
            organization_id,
            kind: CallKind::Sequential,
        }
    }

    async fn wait_until(deadline: Duration, predicate: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if predicate() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        predicate()
    }

    #[tokio::test]
    async fn event_feed_updates_the_snapshot() {
        let state = AppState::new(test_config());
        let store = MemoryQueueStore::new();
        state.install_queue_store(std::sync::Arc::new(store.clone())).await;

        let organization_id = Uuid::new_v4();
        let context = state.context(organization_id);

        let inserted = store
            .insert_call(new_call(organization_id, 7))
            .await
            .unwrap();

        let observer = context.clone();
        assert!(
            wait_until(Duration::from_secs(1), move || {
                observer
                    .last_call()
                    .is_some_and(|call| call.id == inserted.id)
            })
            .await
        );
    }

    #[tokio::test]
    async fn snapshot_is_seeded_from_existing_calls() {
        let state = AppState::new(test_config());
        let store = MemoryQueueStore::new();
        state.install_queue_store(std::sync::Arc::new(store.clone())).await;

        let organization_id = Uuid::new_v4();
        store
            .insert_call(new_call(organization_id, 42))
            .await
            .unwrap();

        let context = state.context(organization_id);
        let observer = context.clone();
        assert!(
            wait_until(Duration::from_secs(1), move || {
                observer
                    .last_call()
                    .is_some_and(|call| call.number == 42)
            })
            .await
        );
    }

    #[tokio::test]
    async fn teardown_stops_both_feeds() {
        let state = AppState::new(test_config());
        let store = MemoryQueueStore::new();
        state.install_queue_store(std::sync::Arc::new(store.clone())).await;

        let organization_id = Uuid::new_v4();
        let context = state.context(organization_id);

        let first = store
            .insert_call(new_call(organization_id, 1))
            .await
            .unwrap();
        let observer = context.clone();
        assert!(
            wait_until(Duration::from_secs(1), move || {
                observer.last_call().is_some()
            })
            .await
        );

        state.drop_context(organization_id);

        store
            .insert_call(new_call(organization_id, 2))
            .await
            .unwrap();
        sleep(Duration::from_millis(150)).await;

        // The context kept its last snapshot but no longer follows the store.
        assert_eq!(context.last_call().unwrap().id, first.id);
    }

    /// How a [`ScriptedWatchStore`] subscription behaves once established.
    #[derive(Clone, Copy)]
    enum WatchScript {
        /// The stream never yields, leaving only the poll feed.
        Silent,
        /// The stream ends right away, as a change stream does when it hits
        /// an unresumable error.
        EndsImmediately,
    }

    /// Store with a scripted change subscription; everything else delegates
    /// to an in-memory store. Counts how often the subscription is opened.
    #[derive(Clone)]
    struct ScriptedWatchStore {
        inner: MemoryQueueStore,
        script: WatchScript,
        subscriptions: std::sync::Arc<AtomicUsize>,
    }

    impl ScriptedWatchStore {
        fn new(script: WatchScript) -> Self {
            Self {
                inner: MemoryQueueStore::new(),
                script,
                subscriptions: std::sync::Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl QueueStore for ScriptedWatchStore {
        fn insert_call(
            &self,
            call: NewCall,
        ) -> BoxFuture<'static, StorageResult<crate::dao::models::CallEntity>> {
            self.inner.insert_call(call)
        }

        fn latest_call(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<crate::dao::models::CallEntity>>> {
            self.inner.latest_call(organization_id)
        }

        fn latest_sequential_call(
            &self,
            organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<crate::dao::models::CallEntity>>> {
            self.inner.latest_sequential_call(organization_id)
        }

        fn watch_calls(
            &self,
            _organization_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<CallWatch>> {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            let script = self.script;
            Box::pin(async move {
                Ok(match script {
                    WatchScript::Silent => futures::stream::pending().boxed(),
                    WatchScript::EndsImmediately => futures::stream::empty().boxed(),
                })
            })
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
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[tokio::test]
    async fn poll_feed_converges_without_a_subscription() {
        let state = AppState::new(test_config());
        let store = ScriptedWatchStore::new(WatchScript::Silent);
        state.install_queue_store(std::sync::Arc::new(store.clone())).await;

        let organization_id = Uuid::new_v4();
        let context = state.context(organization_id);

        let inserted = store
            .insert_call(new_call(organization_id, 11))
            .await
            .unwrap();

        let observer = context.clone();
        assert!(
            wait_until(Duration::from_secs(1), move || {
                observer
                    .last_call()
                    .is_some_and(|call| call.id == inserted.id)
            })
            .await
        );
    }

    #[tokio::test]
    async fn a_dying_subscription_is_retried_at_poll_cadence() {
        let state = AppState::new(test_config());
        let store = ScriptedWatchStore::new(WatchScript::EndsImmediately);
        state.install_queue_store(std::sync::Arc::new(store.clone())).await;

        let organization_id = Uuid::new_v4();
        let _context = state.context(organization_id);

        sleep(Duration::from_millis(200)).await;

        // Initial attempt plus one per 40ms poll tick; anything well beyond
        // that means the loop is respinning the subscription unthrottled.
        let attempts = store.subscriptions.load(Ordering::SeqCst);
        assert!(attempts >= 2, "subscription was never retried");
        assert!(attempts <= 10, "subscription retried {attempts} times in 200ms");

        // The snapshot still converges through the poll feed.
        let inserted = store
            .insert_call(new_call(organization_id, 5))
            .await
            .unwrap();
        let observer = state.context(organization_id);
        assert!(
            wait_until(Duration::from_secs(1), move || {
                observer
                    .last_call()
                    .is_some_and(|call| call.id == inserted.id)
            })
            .await
        );
    }
}
