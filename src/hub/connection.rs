//! Per-client connection lifecycle.
//!
//! Each registered client owns a bounded frame queue drained by a dedicated
//! writer task. The writer forwards frames into the transport pipe (the
//! [`FrameStream`] handed to the HTTP layer) until the client is closed, the
//! peer goes away, or the queue completes.
//!
//! ```text
//! send_to / broadcast ──try_send──▶ queue ──writer task──▶ pipe ──▶ FrameStream ──▶ socket
//! ```
//!
//! State machine: `Open → Closing → Closed`. `Closing` is entered by the
//! first of {explicit close, peer disconnect, queue completion}; the registry
//! entry is removed at that point. `Closed` is entered once the writer has
//! released the transport.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures_util::Stream;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::ConnectionRegistry;
use crate::domain::ClientId;

/// Lifecycle state of a single client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting events; the writer is draining the queue.
    Open,
    /// Removed from the registry; the writer is shutting down.
    Closing,
    /// Transport released. Terminal.
    Closed,
}

/// What ended a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed through [`ClientHandle::close`] or the registry.
    Requested,
    /// The peer stopped reading (transport dropped or reset).
    PeerDisconnected,
    /// The event queue was completed.
    Completed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::PeerDisconnected => "peer_disconnected",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Read side of a client's transport pipe.
///
/// Yields encoded frames in the order they were enqueued for this client.
/// The stream ends once the connection is closed. Dropping it is how the
/// transport signals that the peer disconnected.
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::Receiver<Bytes>,
}

impl FrameStream {
    pub(crate) fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self { rx }
    }

    /// Waits for the next frame, or `None` once the connection is closed.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Stream for FrameStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Caller-side handle to a registered connection.
///
/// Returned by [`ConnectionRegistry::register`]. Dropping the handle does not
/// close the connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    session: Uuid,
    state: watch::Receiver<ConnectionState>,
    registry: ConnectionRegistry,
}

impl ClientHandle {
    pub(crate) fn new(
        id: ClientId,
        session: Uuid,
        state: watch::Receiver<ConnectionState>,
        registry: ConnectionRegistry,
    ) -> Self {
        Self {
            id,
            session,
            state,
            registry,
        }
    }

    /// Returns the client id this handle was registered under.
    #[must_use]
    pub const fn id(&self) -> &ClientId {
        &self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Closes the connection.
    ///
    /// Removes the registry entry (only if it still belongs to this
    /// registration) and stops the writer. Undelivered queued events are
    /// dropped. Idempotent: returns `false` if the connection was already
    /// closing.
    pub async fn close(&self) -> bool {
        self.registry
            .remove_session(&self.id, Some(self.session), CloseReason::Requested)
            .await
    }

    /// Waits until the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
    }
}

/// Everything the writer task needs for one connection.
#[derive(Debug)]
pub(crate) struct Writer {
    pub(crate) id: ClientId,
    pub(crate) session: Uuid,
    pub(crate) queue: mpsc::Receiver<Bytes>,
    pub(crate) pipe: mpsc::Sender<Bytes>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    pub(crate) opening: Option<Bytes>,
    pub(crate) registry: ConnectionRegistry,
}

impl Writer {
    /// Drains the queue into the pipe until the connection ends, then tears
    /// the connection down.
    pub(crate) async fn run(self) {
        let Self {
            id,
            session,
            mut queue,
            pipe,
            state,
            opening,
            registry,
        } = self;
        let mut state_rx = state.subscribe();

        let opened = match opening {
            Some(frame) => pipe.send(frame).await.is_ok(),
            None => true,
        };
        let reason = if opened {
            pump(&mut queue, &pipe, &mut state_rx).await
        } else {
            CloseReason::PeerDisconnected
        };

        registry.remove_session(&id, Some(session), reason).await;
        drop(queue);
        drop(pipe);
        state.send_replace(ConnectionState::Closed);
        tracing::debug!(client_id = %id, %reason, "writer finished");
    }
}

async fn pump(
    queue: &mut mpsc::Receiver<Bytes>,
    pipe: &mpsc::Sender<Bytes>,
    state: &mut watch::Receiver<ConnectionState>,
) -> CloseReason {
    loop {
        let frame = tokio::select! {
            biased;
            () = closing(state) => return CloseReason::Requested,
            () = pipe.closed() => return CloseReason::PeerDisconnected,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => return CloseReason::Completed,
            },
        };

        // A stalled peer must not keep a closed connection alive.
        tokio::select! {
            biased;
            () = closing(state) => return CloseReason::Requested,
            sent = pipe.send(frame) => {
                if sent.is_err() {
                    return CloseReason::PeerDisconnected;
                }
            }
        }
    }
}

/// Resolves once the connection has left [`ConnectionState::Open`].
async fn closing(state: &mut watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(|s| *s != ConnectionState::Open).await;
}
