//! The single serialization point for all relay state.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::connection::{ConnectionId, PeerConnection};
use crate::registry::ConnectionRegistry;
use crate::waiting::WaitingRoom;

/// Registry and waiting room behind one lock.
///
/// Message handlers and the liveness sweep each take the lock for one
/// short, non-awaiting critical section, so they never interleave
/// against shared state. The waiting room is thereby always a subset
/// of bound, open connections: a close is observed and both stores
/// are purged within the same locked step.
#[derive(Default)]
pub struct RelayState {
    /// Every open connection.
    pub registry: ConnectionRegistry,
    /// Peers awaiting a match.
    pub waiting: WaitingRoom,
}

/// Shared handle to the relay state.
pub type SharedState = Arc<Mutex<RelayState>>;

impl RelayState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared, lockable handle.
    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Tear a connection down: unregister it and drop its waiting
    /// entry, in one step. Idempotent; safe to call from both the
    /// session teardown and the liveness sweep.
    pub fn purge_connection(&mut self, conn_id: &ConnectionId) {
        let bound = self.registry.unregister(conn_id);
        let waited = self.waiting.remove_connection(conn_id);
        if bound.is_some() || waited.is_some() {
            info!(
                conn_id = %conn_id,
                peer_id = bound.as_deref().or(waited.as_deref()).unwrap_or("-"),
                "connection purged"
            );
        }
    }

    /// Whether the connection is still registered.
    pub fn is_registered(&self, conn_id: &ConnectionId) -> bool {
        self.registry.get(conn_id).is_some()
    }

    /// Accept a connection into the registry.
    pub fn accept(&mut self, conn: Arc<PeerConnection>) {
        self.registry.register(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_conn() -> Arc<PeerConnection> {
        let (tx, rx) = mpsc::channel(32);
        drop(rx);
        PeerConnection::shared(tx)
    }

    #[test]
    fn purge_removes_from_both_stores() {
        let mut state = RelayState::new();
        let conn = make_conn();
        state.accept(conn.clone());
        let _ = state.registry.bind(&conn.id, "alice");
        state.waiting.enqueue("alice", conn.clone());

        state.purge_connection(&conn.id);
        assert!(state.registry.is_empty());
        assert!(state.waiting.is_empty());
        assert!(state.registry.lookup_by_peer("alice").is_none());
    }

    #[test]
    fn purge_is_idempotent() {
        let mut state = RelayState::new();
        let conn = make_conn();
        state.accept(conn.clone());
        state.purge_connection(&conn.id);
        state.purge_connection(&conn.id);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn purge_unbound_connection() {
        let mut state = RelayState::new();
        let conn = make_conn();
        state.accept(conn.clone());
        state.purge_connection(&conn.id);
        assert!(!state.is_registered(&conn.id));
    }
}
