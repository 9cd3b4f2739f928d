//! Connection registry: the addressable set of live subscribers.
//!
//! [`ConnectionRegistry`] maps each [`ClientId`] to its per-client queue.
//! One coarse `RwLock` guards the map. Sends take the read lock and only
//! `try_send` into the target queue; inserts and removals take the write
//! lock. No socket I/O ever happens under the lock: the per-client writer
//! task does all writing, so a stalled client only fills its own queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc, watch};
use utoipa::ToSchema;
use uuid::Uuid;

use super::connection::{ClientHandle, CloseReason, ConnectionState, FrameStream, Writer};
use crate::domain::{ClientId, EncodeError, Event, encode, encoder};
use crate::error::HubError;

/// Default number of frames buffered per client before new events are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Frames buffered between the writer task and the transport.
const PIPE_CAPACITY: usize = 1;

/// Registry entry for one live connection.
#[derive(Debug)]
struct ClientEntry {
    /// Distinguishes this registration from later ones reusing the same id.
    session: Uuid,
    queue: mpsc::Sender<Bytes>,
    state: Arc<watch::Sender<ConnectionState>>,
    connected_at: DateTime<Utc>,
    dropped: AtomicU64,
}

impl ClientEntry {
    /// Enqueues a frame without waiting. Full queues drop the new frame.
    fn offer(&self, id: &ClientId, frame: Bytes) -> bool {
        match self.queue.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed).saturating_add(1);
                tracing::warn!(client_id = %id, dropped, "client queue full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn mark_closing(&self) {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Open {
                *state = ConnectionState::Closing;
                true
            } else {
                false
            }
        });
    }
}

/// Snapshot of one connected client for listing endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientSummary {
    /// Client identifier.
    #[schema(value_type = String)]
    pub client_id: ClientId,
    /// When the client registered.
    pub connected_at: DateTime<Utc>,
    /// Frames waiting in the client's queue.
    pub queued: usize,
    /// Events dropped because the queue was full.
    pub dropped: u64,
}

#[derive(Debug)]
struct Inner {
    clients: RwLock<HashMap<ClientId, ClientEntry>>,
    queue_capacity: usize,
    retry_hint: Option<u64>,
}

/// Shared registry of connected clients.
///
/// Cheap to clone; all clones refer to the same map. Created once at
/// startup and shared by the HTTP layer, the heartbeat, and every writer
/// task.
///
/// # Delivery semantics
///
/// - Per client, frames are written in the order they were accepted.
/// - Across clients, no ordering is defined.
/// - Each client's queue holds at most `queue_capacity` frames; when full,
///   the incoming event is dropped for that client and counted.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<Inner>,
}

impl ConnectionRegistry {
    /// Creates an empty registry whose clients buffer up to
    /// `queue_capacity` frames each (at least one).
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_options(queue_capacity, None)
    }

    /// Like [`ConnectionRegistry::new`], additionally opening every new
    /// stream with a `retry:` hint frame when `retry_hint` is set.
    #[must_use]
    pub fn with_options(queue_capacity: usize, retry_hint: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Inner {
                clients: RwLock::new(HashMap::new()),
                queue_capacity: queue_capacity.max(1),
                retry_hint,
            }),
        }
    }

    /// Registers a new client and starts its writer task.
    ///
    /// Returns a [`ClientHandle`] for closing the connection and the
    /// [`FrameStream`] the transport should forward to the peer. Dropping the
    /// stream is treated as a peer disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::DuplicateClient`] if a live connection is already
    /// registered under `id`. The existing connection is left untouched.
    pub async fn register(&self, id: ClientId) -> Result<(ClientHandle, FrameStream), HubError> {
        let session = Uuid::new_v4();
        let (queue_tx, queue_rx) = mpsc::channel(self.inner.queue_capacity);
        let (pipe_tx, pipe_rx) = mpsc::channel(PIPE_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Open);
        let state_tx = Arc::new(state_tx);

        {
            let mut map = self.inner.clients.write().await;
            if map.contains_key(&id) {
                tracing::warn!(client_id = %id, "rejected duplicate registration");
                return Err(HubError::DuplicateClient(id));
            }
            map.insert(
                id.clone(),
                ClientEntry {
                    session,
                    queue: queue_tx,
                    state: Arc::clone(&state_tx),
                    connected_at: Utc::now(),
                    dropped: AtomicU64::new(0),
                },
            );
        }

        let writer = Writer {
            id: id.clone(),
            session,
            queue: queue_rx,
            pipe: pipe_tx,
            state: state_tx,
            opening: self.inner.retry_hint.map(encoder::encode_retry),
            registry: self.clone(),
        };
        tokio::spawn(writer.run());

        tracing::info!(client_id = %id, %session, "client registered");
        let handle = ClientHandle::new(id, session, state_rx, self.clone());
        Ok((handle, FrameStream::new(pipe_rx)))
    }

    /// Removes the client registered under `id` and closes its connection.
    ///
    /// Idempotent: returns `false` without error if no such client exists.
    pub async fn unregister(&self, id: &ClientId) -> bool {
        self.remove_session(id, None, CloseReason::Requested).await
    }

    /// Removes the entry for `id`, but only if it belongs to `session` (when
    /// given). Exactly one caller observes `true` per registration.
    pub(crate) async fn remove_session(
        &self,
        id: &ClientId,
        session: Option<Uuid>,
        reason: CloseReason,
    ) -> bool {
        let removed = {
            let mut map = self.inner.clients.write().await;
            let owned = map
                .get(id)
                .is_some_and(|entry| session.is_none_or(|s| entry.session == s));
            if owned { map.remove(id) } else { None }
        };

        let Some(entry) = removed else {
            return false;
        };
        entry.mark_closing();
        tracing::info!(client_id = %id, %reason, "client unregistered");
        true
    }

    /// Enqueues `event` for the client registered under `id`.
    ///
    /// Returns `Ok(false)` if the client is not connected or its queue is
    /// full. Never waits on network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the event cannot be encoded.
    pub async fn send_to(&self, id: &ClientId, event: &Event) -> Result<bool, EncodeError> {
        let frame = encode(event)?;
        Ok(self.send_frame(id, frame).await)
    }

    /// Enqueues an already encoded frame for one client.
    pub async fn send_frame(&self, id: &ClientId, frame: Bytes) -> bool {
        let map = self.inner.clients.read().await;
        let delivered = map.get(id).is_some_and(|entry| entry.offer(id, frame));
        tracing::debug!(client_id = %id, delivered, "send");
        delivered
    }

    /// Enqueues `event` for every connected client.
    ///
    /// Returns the number of clients it was enqueued to. Clients whose queue
    /// is full are skipped. The recipient set is whatever is registered at
    /// the moment the read lock is taken.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the event cannot be encoded.
    pub async fn broadcast(&self, event: &Event) -> Result<usize, EncodeError> {
        let frame = encode(event)?;
        let map = self.inner.clients.read().await;
        let delivered = map
            .iter()
            .filter(|(id, entry)| entry.offer(id, frame.clone()))
            .count();
        tracing::debug!(recipients = map.len(), delivered, "broadcast");
        Ok(delivered)
    }

    /// Closes every connection. Returns how many were closed.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<(ClientId, ClientEntry)> = {
            let mut map = self.inner.clients.write().await;
            map.drain().collect()
        };
        for (id, entry) in &drained {
            entry.mark_closing();
            tracing::info!(client_id = %id, reason = %CloseReason::Requested, "client unregistered");
        }
        drained.len()
    }

    /// Returns `true` if a client is registered under `id`.
    pub async fn contains(&self, id: &ClientId) -> bool {
        self.inner.clients.read().await.contains_key(id)
    }

    /// Returns the number of connected clients.
    pub async fn len(&self) -> usize {
        self.inner.clients.read().await.len()
    }

    /// Returns `true` if no clients are connected.
    pub async fn is_empty(&self) -> bool {
        self.inner.clients.read().await.is_empty()
    }

    /// Returns a summary of every connected client, sorted by id.
    pub async fn clients(&self) -> Vec<ClientSummary> {
        let map = self.inner.clients.read().await;
        let mut summaries: Vec<ClientSummary> = map
            .iter()
            .map(|(id, entry)| ClientSummary {
                client_id: id.clone(),
                connected_at: entry.connected_at,
                queued: entry
                    .queue
                    .max_capacity()
                    .saturating_sub(entry.queue.capacity()),
                dropped: entry.dropped.load(Ordering::Relaxed),
            })
            .collect();
        summaries.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        summaries
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
