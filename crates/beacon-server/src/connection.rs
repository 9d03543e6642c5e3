//! Per-connection state and the outbound send channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use beacon_protocol::ServerMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique connection identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the session's writer task should put on the wire.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A JSON text frame.
    Text(String),
    /// A WebSocket Ping frame (liveness probe).
    Probe,
    /// A close frame; the writer exits afterwards.
    Close,
}

/// One live transport session.
///
/// Created on accept (unbound), bound to a peer identifier on the
/// first `join`, destroyed exactly once on close, error, or forced
/// termination. The registry owns the record; sessions and waiting
/// entries hold non-owning `Arc` references.
pub struct PeerConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Bound peer identifier (absent until a `join` arrives).
    peer_id: Mutex<Option<String>>,
    /// Send channel to the connection's writer task.
    tx: mpsc::Sender<Outbound>,
    /// Whether the client answered the most recent liveness probe.
    alive: AtomicBool,
    /// Cleared on close or forced termination.
    open: AtomicBool,
    /// Cancelled to tear the session down from outside.
    cancel: CancellationToken,
    /// When this connection was accepted.
    pub connected_at: Instant,
}

impl PeerConnection {
    /// Create a new connection around an outbound channel.
    pub fn new(tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id: ConnectionId::new(),
            peer_id: Mutex::new(None),
            tx,
            alive: AtomicBool::new(true),
            open: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            connected_at: Instant::now(),
        }
    }

    /// Create a shared connection.
    pub fn shared(tx: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self::new(tx))
    }

    /// The bound peer identifier, if any.
    pub fn peer_id(&self) -> Option<String> {
        self.peer_id.lock().clone()
    }

    /// Bind (or rebind) the peer identifier, returning the previous
    /// binding. Reverse-index maintenance is the registry's job.
    pub fn bind_peer(&self, peer_id: String) -> Option<String> {
        self.peer_id.lock().replace(peer_id)
    }

    /// Whether the transport is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }

    /// Enqueue a text frame. Fire-and-forget: returns `false` if the
    /// queue is full or the writer is gone.
    pub fn send_text(&self, text: String) -> bool {
        self.tx.try_send(Outbound::Text(text)).is_ok()
    }

    /// Serialize and enqueue a [`ServerMessage`].
    pub fn send_msg(&self, msg: &ServerMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(json) => self.send_text(json),
            Err(_) => false,
        }
    }

    /// Enqueue a liveness probe (Ping frame).
    pub fn send_probe(&self) -> bool {
        self.tx.try_send(Outbound::Probe).is_ok()
    }

    /// Mark the connection as alive (probe answered).
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Check and clear the alive flag for the liveness sweep.
    ///
    /// Returns `true` if the connection answered a probe (or was
    /// freshly accepted) since the last sweep. After this call the
    /// flag is `false` until the next Pong, so a connection that goes
    /// silent is terminated on the *second* sweep that sees it.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    /// Close the connection: mark it closed and wake the session
    /// tasks. Idempotent.
    pub fn close(&self) {
        self.open.store(false, Ordering::Relaxed);
        let _ = self.tx.try_send(Outbound::Close);
        self.cancel.cancel();
    }

    /// Token cancelled when the connection is closed from outside.
    pub fn closed_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
