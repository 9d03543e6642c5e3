//! Connection registry with a `peerId → connection` reverse index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::{ConnectionId, PeerConnection};

/// Tracks every open connection and its bound identifier.
///
/// Exactly one record per accepted connection, from accept to
/// teardown. All operations are O(1) amortized. The registry itself
/// is not synchronized; it lives behind the single state mutex (see
/// [`crate::state::RelayState`]).
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Arc<PeerConnection>>,
    /// Reverse index: bound peer identifier → connection.
    by_peer: HashMap<String, ConnectionId>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted, unbound connection.
    pub fn register(&mut self, conn: Arc<PeerConnection>) {
        let _ = self.connections.insert(conn.id.clone(), conn);
    }

    /// Bind `peer_id` to the connection, maintaining the reverse
    /// index. Returns the identifier the connection was previously
    /// bound to, if it differed.
    ///
    /// Rebinding releases the old binding atomically: the old reverse
    /// entry is removed before the new one is installed, so no stale
    /// mapping survives. Binding an identifier already held by
    /// another connection steals it: the reverse index always points
    /// at the most recent joiner.
    pub fn bind(&mut self, conn_id: &ConnectionId, peer_id: &str) -> Option<String> {
        let conn = self.connections.get(conn_id)?;
        let previous = conn.bind_peer(peer_id.to_string());

        let displaced = match previous {
            Some(old) if old != peer_id => {
                if self.by_peer.get(&old) == Some(conn_id) {
                    let _ = self.by_peer.remove(&old);
                }
                Some(old)
            }
            _ => None,
        };
        let _ = self.by_peer.insert(peer_id.to_string(), conn_id.clone());
        displaced
    }

    /// The open connection bound to `peer_id`, if any.
    pub fn lookup_by_peer(&self, peer_id: &str) -> Option<Arc<PeerConnection>> {
        let conn_id = self.by_peer.get(peer_id)?;
        self.connections
            .get(conn_id)
            .filter(|c| c.is_open())
            .cloned()
    }

    /// The connection with the given ID, if registered.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<PeerConnection>> {
        self.connections.get(conn_id).cloned()
    }

    /// Remove the record and its reverse-index entry, returning the
    /// identifier that was bound, if any. Idempotent: the first
    /// removal wins and later calls return `None`.
    ///
    /// If the identifier's binding was stolen by a newer connection,
    /// the stolen reverse entry is left untouched.
    pub fn unregister(&mut self, conn_id: &ConnectionId) -> Option<String> {
        let conn = self.connections.remove(conn_id)?;
        let bound = conn.peer_id();
        if let Some(peer_id) = &bound {
            if self.by_peer.get(peer_id) == Some(conn_id) {
                let _ = self.by_peer.remove(peer_id);
            }
        }
        bound
    }

    /// Snapshot of every registered connection, for the liveness
    /// sweep and shutdown broadcast.
    pub fn connections(&self) -> Vec<Arc<PeerConnection>> {
        self.connections.values().cloned().collect()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_conn() -> Arc<PeerConnection> {
        let (tx, rx) = mpsc::channel(32);
        // Receiver is dropped; registry tests never send.
        drop(rx);
        PeerConnection::shared(tx)
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        assert_eq!(reg.len(), 1);
        assert!(reg.get(&conn.id).is_some());
        assert!(reg.lookup_by_peer("alice").is_none());
    }

    #[test]
    fn bind_creates_reverse_mapping() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        assert_eq!(reg.bind(&conn.id, "alice"), None);

        let found = reg.lookup_by_peer("alice").unwrap();
        assert_eq!(found.id, conn.id);
    }

    #[test]
    fn bind_unknown_connection_is_noop() {
        let mut reg = ConnectionRegistry::new();
        let ghost = ConnectionId::new();
        assert_eq!(reg.bind(&ghost, "alice"), None);
        assert!(reg.lookup_by_peer("alice").is_none());
    }

    #[test]
    fn rebind_releases_old_mapping() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        let _ = reg.bind(&conn.id, "alice");

        let displaced = reg.bind(&conn.id, "bob");
        assert_eq!(displaced.as_deref(), Some("alice"));
        assert!(reg.lookup_by_peer("alice").is_none());
        assert_eq!(reg.lookup_by_peer("bob").unwrap().id, conn.id);
    }

    #[test]
    fn rebind_same_identifier_reports_no_displacement() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        let _ = reg.bind(&conn.id, "alice");
        assert_eq!(reg.bind(&conn.id, "alice"), None);
        assert!(reg.lookup_by_peer("alice").is_some());
    }

    #[test]
    fn newer_connection_steals_binding() {
        let mut reg = ConnectionRegistry::new();
        let old = make_conn();
        let new = make_conn();
        reg.register(old.clone());
        reg.register(new.clone());
        let _ = reg.bind(&old.id, "alice");
        let _ = reg.bind(&new.id, "alice");

        assert_eq!(reg.lookup_by_peer("alice").unwrap().id, new.id);
    }

    #[test]
    fn unregister_after_steal_keeps_new_mapping() {
        let mut reg = ConnectionRegistry::new();
        let old = make_conn();
        let new = make_conn();
        reg.register(old.clone());
        reg.register(new.clone());
        let _ = reg.bind(&old.id, "alice");
        let _ = reg.bind(&new.id, "alice");

        // The old connection still reports "alice" but no longer owns
        // the reverse entry; its teardown must not clobber it.
        assert_eq!(reg.unregister(&old.id).as_deref(), Some("alice"));
        assert_eq!(reg.lookup_by_peer("alice").unwrap().id, new.id);
    }

    #[test]
    fn unregister_returns_bound_identifier() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        let _ = reg.bind(&conn.id, "alice");

        assert_eq!(reg.unregister(&conn.id).as_deref(), Some("alice"));
        assert!(reg.lookup_by_peer("alice").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn unregister_unbound_returns_none() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        assert_eq!(reg.unregister(&conn.id), None);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        let _ = reg.bind(&conn.id, "alice");
        assert!(reg.unregister(&conn.id).is_some());
        assert!(reg.unregister(&conn.id).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn lookup_skips_closed_connection() {
        let mut reg = ConnectionRegistry::new();
        let conn = make_conn();
        reg.register(conn.clone());
        let _ = reg.bind(&conn.id, "alice");
        conn.close();
        assert!(reg.lookup_by_peer("alice").is_none());
    }

    #[test]
    fn connections_snapshot() {
        let mut reg = ConnectionRegistry::new();
        reg.register(make_conn());
        reg.register(make_conn());
        assert_eq!(reg.connections().len(), 2);
    }
}
