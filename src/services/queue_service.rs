use std::sync::Arc;

use uuid::Uuid;

use crate::{
    dao::{
        models::{CallEntity, CallKind, CounterEntity, NewCall, OrganizationEntity},
        queue_store::QueueStore,
    },
    error::ServiceError,
    state::SharedState,
};

/// Compute the ticket number that follows `last` under the ceiling
/// `max_count`.
///
/// The sequence is 1-based and wraps: past the ceiling the next ticket is 1
/// again. A last number at or above the ceiling also resets to 1, which
/// covers an operator lowering `max_count` below the most recent ticket.
pub fn next_number(last: Option<u32>, max_count: u32) -> u32 {
    let max_count = max_count.max(1);
    match last {
        Some(last) if last < max_count => last + 1,
        Some(_) => 1,
        None => 1,
    }
}

/// Issue the next sequential ticket from `counter_id` and announce it.
///
/// The new call is applied to the organization's live context right away, so
/// the operator who issued it sees it without waiting for a feed round trip.
pub async fn call_next(
    state: &SharedState,
    organization: &OrganizationEntity,
    counter_id: Option<Uuid>,
) -> Result<CallEntity, ServiceError> {
    let store = state.require_queue_store().await?;
    let counter = resolve_counter(&store, organization.id, counter_id).await?;

    let last = store.latest_sequential_call(organization.id).await?;
    let number = next_number(last.map(|call| call.number), organization.max_count);

    let call = store
        .insert_call(NewCall {
            number,
            counter_id: counter.id,
            counter_name: counter.name,
            organization_id: organization.id,
            kind: CallKind::Sequential,
        })
        .await?;

    state.context(organization.id).observe(call.clone());
    Ok(call)
}

/// Announce one explicit ticket number from `counter_id`.
///
/// Specific calls never move the sequential cursor, so an operator can recall
/// a missed ticket without disturbing the queue. The number is checked before
/// anything is written: a failed call leaves both the log and the snapshot
/// untouched.
pub async fn call_specific(
    state: &SharedState,
    organization: &OrganizationEntity,
    counter_id: Option<Uuid>,
    number: u32,
) -> Result<CallEntity, ServiceError> {
    if number == 0 {
        return Err(ServiceError::InvalidNumber);
    }
    if number > organization.max_count {
        return Err(ServiceError::NumberExceedsLimit {
            max_count: organization.max_count,
        });
    }

    let store = state.require_queue_store().await?;
    let counter = resolve_counter(&store, organization.id, counter_id).await?;

    let call = store
        .insert_call(NewCall {
            number,
            counter_id: counter.id,
            counter_name: counter.name,
            organization_id: organization.id,
            kind: CallKind::Specific,
        })
        .await?;

    state.context(organization.id).observe(call.clone());
    Ok(call)
}

/// Latest call for the organization, served from the live snapshot when it is
/// populated and read through to the store otherwise.
pub async fn last_call(
    state: &SharedState,
    organization_id: Uuid,
) -> Result<Option<CallEntity>, ServiceError> {
    let context = state.context(organization_id);
    if let Some(call) = context.last_call() {
        return Ok(Some(call));
    }

    let store = state.require_queue_store().await?;
    let call = store.latest_call(organization_id).await?;
    if let Some(call) = &call {
        context.observe(call.clone());
    }
    Ok(call)
}

/// A call may only be issued from an active counter of the caller's own
/// organization; everything else reads as "no counter selected".
async fn resolve_counter(
    store: &Arc<dyn QueueStore>,
    organization_id: Uuid,
    counter_id: Option<Uuid>,
) -> Result<CounterEntity, ServiceError> {
    let id = counter_id.ok_or(ServiceError::NoCounterSelected)?;
    let counter = store
        .find_counter(id)
        .await?
        .ok_or(ServiceError::NoCounterSelected)?;
    if counter.organization_id != organization_id || !counter.active {
        return Err(ServiceError::NoCounterSelected);
    }
    Ok(counter)
}
