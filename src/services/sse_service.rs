use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{dto::sse::ServerEvent, state::QueueContext};

/// Subscribe to the organization's display stream.
pub fn subscribe(context: &QueueContext) -> broadcast::Receiver<ServerEvent> {
    context.hub().subscribe()
}

/// Forward hub broadcasts into a per-connection stream.
///
/// The greeting, when given, is queued ahead of anything from the hub and
/// reaches only this connection; other displays never see it.
fn forward_events(
    mut receiver: broadcast::Receiver<ServerEvent>,
    organization_id: Uuid,
    greeting: Option<ServerEvent>,
) -> ReceiverStream<ServerEvent> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<ServerEvent>(8);

    if let Some(event) = greeting {
        // The channel is freshly created, so this cannot fail.
        let _ = tx.try_send(event);
    }

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(payload).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive;
                            // the next call announcement carries fresh state.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(%organization_id, "display SSE stream disconnected");
    });

    ReceiverStream::new(rx)
}

fn to_axum_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, delivering the greeting
/// first and cleaning up once the display disconnects.
pub fn to_sse_stream(
    receiver: broadcast::Receiver<ServerEvent>,
    organization_id: Uuid,
    greeting: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = forward_events(receiver, organization_id, greeting)
        .map(|payload| Ok(to_axum_event(payload)));

    // when the display disconnects axum drops this stream
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SseHub;

    fn named(event: &str) -> ServerEvent {
        ServerEvent {
            event: Some(event.to_string()),
            data: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn greeting_reaches_only_the_new_subscriber() {
        let hub = SseHub::new(8);
        let organization_id = Uuid::new_v4();

        let mut veteran = forward_events(hub.subscribe(), organization_id, None);
        let mut newcomer =
            forward_events(hub.subscribe(), organization_id, Some(named("handshake")));

        hub.broadcast(named("call.announced"));

        let first = newcomer.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some("handshake"));
        let second = newcomer.next().await.unwrap();
        assert_eq!(second.event.as_deref(), Some("call.announced"));

        // The veteran connection sees the broadcast but never the greeting.
        let seen = veteran.next().await.unwrap();
        assert_eq!(seen.event.as_deref(), Some("call.announced"));
    }
}
