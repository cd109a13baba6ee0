use uuid::Uuid;

use crate::{
    dao::models::{CounterEntity, NewCounter},
    error::ServiceError,
    state::SharedState,
};

/// Active counters of the organization, oldest first.
pub async fn list(
    state: &SharedState,
    organization_id: Uuid,
) -> Result<Vec<CounterEntity>, ServiceError> {
    let store = state.require_queue_store().await?;
    Ok(store.list_active_counters(organization_id).await?)
}

/// Create a counter for the organization.
pub async fn create(
    state: &SharedState,
    organization_id: Uuid,
    name: &str,
) -> Result<CounterEntity, ServiceError> {
    let name = normalized_name(name)?;
    let store = state.require_queue_store().await?;
    Ok(store
        .insert_counter(NewCounter {
            name,
            organization_id,
        })
        .await?)
}

/// Rename one of the organization's counters.
///
/// Past calls keep the name the counter had when they were issued.
pub async fn rename(
    state: &SharedState,
    organization_id: Uuid,
    counter_id: Uuid,
    name: &str,
) -> Result<CounterEntity, ServiceError> {
    let name = normalized_name(name)?;
    let store = state.require_queue_store().await?;
    owned_counter(state, organization_id, counter_id).await?;
    store
        .rename_counter(counter_id, name)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("counter {counter_id}")))
}

/// Deactivate one of the organization's counters.
///
/// Deactivation is a soft delete: the counter stops accepting calls and
/// disappears from listings, but its call history stays intact.
pub async fn deactivate(
    state: &SharedState,
    organization_id: Uuid,
    counter_id: Uuid,
) -> Result<CounterEntity, ServiceError> {
    let store = state.require_queue_store().await?;
    owned_counter(state, organization_id, counter_id).await?;
    store
        .deactivate_counter(counter_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("counter {counter_id}")))
}

async fn owned_counter(
    state: &SharedState,
    organization_id: Uuid,
    counter_id: Uuid,
) -> Result<CounterEntity, ServiceError> {
    let store = state.require_queue_store().await?;
    let counter = store
        .find_counter(counter_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("counter {counter_id}")))?;
    if counter.organization_id != organization_id {
        return Err(ServiceError::NotFound(format!("counter {counter_id}")));
    }
    Ok(counter)
}

fn normalized_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(
            "counter name must not be empty".into(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::NewOrganization,
            queue_store::{QueueStore, memory::MemoryQueueStore},
        },
        state::AppState,
    };

    async fn state_with_store() -> (SharedState, MemoryQueueStore) {
        let state = AppState::new(AppConfig {
            poll_interval: Duration::from_millis(40),
            ..AppConfig::default()
        });
        let store = MemoryQueueStore::new();
        state
            .install_queue_store(std::sync::Arc::new(store.clone()))
            .await;
        (state, store)
    }

    async fn organization(store: &MemoryQueueStore, owner_email: &str) -> Uuid {
        store
            .create_organization(NewOrganization {
                name: owner_email.split('@').next().unwrap().into(),
                owner_email: owner_email.into(),
                max_count: 99,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn deactivated_counters_leave_the_listing() {
        let (state, store) = state_with_store().await;
        let organization_id = organization(&store, "acme@example.com").await;

        let keep = create(&state, organization_id, "Desk 1").await.unwrap();
        let drop = create(&state, organization_id, "Desk 2").await.unwrap();
        deactivate(&state, organization_id, drop.id).await.unwrap();

        let listed = list(&state, organization_id).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![keep.id]
        );
    }

    #[tokio::test]
    async fn rename_keeps_history_names_intact() {
        let (state, store) = state_with_store().await;
        let organization_id = organization(&store, "acme@example.com").await;

        let counter = create(&state, organization_id, "Desk 1").await.unwrap();
        let renamed = rename(&state, organization_id, counter.id, "Front desk")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Front desk");
        assert!(renamed.updated_at >= counter.updated_at);
    }

    #[tokio::test]
    async fn counters_are_invisible_across_organizations() {
        let (state, store) = state_with_store().await;
        let mine = organization(&store, "acme@example.com").await;
        let theirs = organization(&store, "other@example.com").await;

        let counter = create(&state, theirs, "Desk 1").await.unwrap();
        let err = deactivate(&state, mine, counter.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let (state, store) = state_with_store().await;
        let organization_id = organization(&store, "acme@example.com").await;

        let err = create(&state, organization_id, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
