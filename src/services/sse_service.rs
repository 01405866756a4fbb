use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::{
    dto::{common::PhaseSnapshot, sse::Handshake, sse::ServerEvent},
    state::{SessionState, SharedState},
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Subscribe to a session's SSE stream and greet the new subscriber with a
/// handshake carrying the current phase snapshot and the degraded flag.
pub async fn subscribe(
    state: &SharedState,
    session: &Arc<SessionState>,
) -> broadcast::Receiver<ServerEvent> {
    let receiver = session.sse().subscribe();

    let handshake = Handshake {
        message: "session stream connected".into(),
        degraded: state.is_degraded().await,
        snapshot: PhaseSnapshot::from(&session.snapshot().await),
    };
    match ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake) {
        Ok(event) => session.sse().broadcast(event),
        Err(err) => warn!(
            session_id = %session.id(),
            error = %err,
            "failed to serialize SSE handshake"
        ),
    }

    receiver
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
