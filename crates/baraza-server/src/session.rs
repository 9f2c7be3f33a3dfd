//! WebSocket query endpoint and per-connection session loop.
//!
//! Each connection gets a [`ConnectionSession`]. The session reads text
//! frames, admits at most one query at a time to the backend through its
//! [`BusyGate`], runs the backend call on the blocking pool, and keeps reading
//! while that call is outstanding so that extra queries get the busy notice
//! and a hangup is noticed immediately.
//!
//! Outgoing frames go through a bounded channel drained by a writer task,
//! which closes the socket once, after the last frame.

use crate::gate::BusyGate;
use crate::normalize::normalize;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use baraza_rag::QueryError;
use baraza_types::{BackendResult, SessionState, BUSY_NOTICE, FAILURE_NOTICE};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

/// Outgoing frames buffered per connection before new ones are dropped.
const OUTBOUND_QUEUE: usize = 32;

type Dispatch = JoinHandle<Result<BackendResult, QueryError>>;

/// WebSocket handler: `GET <ws_path>`.
///
/// Upgrades the connection and hands it to a fresh [`ConnectionSession`].
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_bytes = state.settings.max_frame_bytes;
    ws.max_message_size(max_bytes)
        .max_frame_size(max_bytes)
        .on_upgrade(move |socket| ConnectionSession::new(state, addr).run(socket))
}

/// Sending half as seen by the session loop. Never fails: a frame that
/// cannot be delivered is logged and dropped.
struct Outbound {
    tx: mpsc::Sender<String>,
    session_id: Uuid,
}

impl Outbound {
    /// Queues a busy or failure notice. Never waits; dropped if the queue is full.
    fn notify(&self, notice: &str) {
        if let Err(e) = self.tx.try_send(notice.to_string()) {
            tracing::warn!(
                session_id = %self.session_id,
                "dropping outgoing notice: {}",
                e
            );
        }
    }

    /// Queues the answer to an accepted query, waiting for room if needed.
    async fn reply(&self, response: String) {
        if let Err(e) = self.tx.send(response).await {
            tracing::warn!(
                session_id = %self.session_id,
                response_len = e.0.len(),
                "dropping reply: connection writer is gone"
            );
        }
    }
}

/// Lifecycle of one client connection.
pub struct ConnectionSession {
    id: Uuid,
    remote_addr: SocketAddr,
    state: Arc<AppState>,
    gate: BusyGate,
    phase: SessionState,
}

impl ConnectionSession {
    pub fn new(state: Arc<AppState>, remote_addr: SocketAddr) -> Self {
        let gate = state.session_gate();
        Self {
            id: Uuid::new_v4(),
            remote_addr,
            state,
            gate,
            phase: SessionState::Connecting,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(session_id = %self.id, from = ?self.phase, to = ?next, "session state");
        self.phase = next;
    }

    /// Runs the session until the peer leaves or the transport fails, then
    /// closes the socket.
    pub async fn run(mut self, socket: WebSocket) {
        let (sender, mut receiver) = socket.split();
        let (tx, rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);
        let writer = tokio::spawn(write_frames(sender, rx, self.id));
        let outbound = Outbound {
            tx,
            session_id: self.id,
        };

        self.transition(SessionState::Open);
        tracing::info!(
            session_id = %self.id,
            remote_addr = %self.remote_addr,
            "websocket connection established"
        );

        let mut in_flight: Option<Dispatch> = None;

        loop {
            tokio::select! {
                biased;

                joined = outstanding(&mut in_flight) => {
                    in_flight = None;
                    self.complete(joined, &outbound).await;
                }
                frame = receiver.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        // A call that finished while this frame was in transit
                        // is collected first so its slot counts as free.
                        if in_flight.as_ref().is_some_and(|handle| handle.is_finished()) {
                            let joined = outstanding(&mut in_flight).await;
                            in_flight = None;
                            self.complete(joined, &outbound).await;
                        }
                        self.accept(text.to_string(), &mut in_flight, &outbound);
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::warn!(
                            session_id = %self.id,
                            len = bytes.len(),
                            "ignoring binary frame; queries must be text"
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(session_id = %self.id, "websocket disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(session_id = %self.id, "websocket receive failed: {}", e);
                        outbound.notify(FAILURE_NOTICE);
                        break;
                    }
                },
            }
        }

        self.transition(SessionState::Closing);
        if in_flight.is_some() {
            // The blocking call cannot be interrupted; it finishes on its own,
            // frees the gate, and its result is dropped with the handle.
            tracing::info!(
                session_id = %self.id,
                "peer left with a query outstanding; its result will be discarded"
            );
        }

        drop(outbound);
        if let Err(e) = writer.await {
            tracing::error!(session_id = %self.id, "websocket writer task failed: {}", e);
        }
        self.transition(SessionState::Closed);
        tracing::info!(session_id = %self.id, "websocket connection closed");
    }

    /// Admits `query` to the backend, or answers with the busy notice.
    fn accept(&self, query: String, in_flight: &mut Option<Dispatch>, outbound: &Outbound) {
        tracing::info!(session_id = %self.id, query_len = query.len(), "received query");
        tracing::debug!(session_id = %self.id, query = %query, "query text");

        // One outstanding query per session regardless of gate capacity, so
        // replies always follow acceptance order.
        let guard = match in_flight {
            Some(_) => None,
            None => self.gate.try_acquire(),
        };
        let Some(guard) = guard else {
            tracing::info!(session_id = %self.id, "backend busy; rejecting query");
            outbound.notify(BUSY_NOTICE);
            return;
        };

        let processor = self.state.processor.clone();
        *in_flight = Some(tokio::task::spawn_blocking(move || {
            let result = processor.process(&query);
            // Free the slot before anything else happens with the result.
            drop(guard);
            result
        }));
    }

    /// Handles the outcome of a finished backend call.
    async fn complete(
        &self,
        joined: Result<Result<BackendResult, QueryError>, JoinError>,
        outbound: &Outbound,
    ) {
        match joined {
            Ok(Ok(result)) => {
                let response = normalize(&result);
                tracing::info!(
                    session_id = %self.id,
                    response_len = response.len(),
                    reply_mode = %self.state.settings.reply_mode,
                    "query answered"
                );
                if self.state.settings.reply_mode.echoes() {
                    outbound.reply(response.clone()).await;
                }
                self.state.speech.speak(response);
            }
            Ok(Err(e)) => {
                tracing::error!(session_id = %self.id, "error processing query: {}", e);
                outbound.notify(FAILURE_NOTICE);
            }
            Err(e) => {
                tracing::error!(session_id = %self.id, "query processing task failed: {}", e);
                outbound.notify(FAILURE_NOTICE);
            }
        }
    }
}

/// Resolves when the outstanding dispatch finishes; pending forever if there
/// is none.
async fn outstanding(
    in_flight: &mut Option<Dispatch>,
) -> Result<Result<BackendResult, QueryError>, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Forwards queued frames to the socket, then closes it.
async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    session_id: Uuid,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sender.send(Message::Text(frame.into())).await {
            tracing::warn!(
                session_id = %session_id,
                "write to closed connection dropped: {}",
                e
            );
            break;
        }
    }
    if let Err(e) = sender.close().await {
        tracing::debug!(session_id = %session_id, "websocket close after peer hangup: {}", e);
    }
}
