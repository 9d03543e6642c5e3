//! The waiting room: identifiers seeking a match, in insertion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::connection::{ConnectionId, PeerConnection};

/// One identifier currently waiting for a match.
pub struct WaitingEntry {
    /// Identifier, unique within the room.
    pub peer_id: String,
    /// When this entry was (last) enqueued.
    pub enqueued_at: Instant,
    /// Non-owning reference to the peer's connection. The room never
    /// closes a connection itself.
    pub conn: Arc<PeerConnection>,
}

/// Insertion-ordered pool of peers waiting to be paired.
///
/// Backed by a `Vec`: the candidate order for matching is exactly
/// arrival order, and per-operation work is bounded by the number of
/// waiters. Lives behind the single state mutex alongside the
/// registry.
#[derive(Default)]
pub struct WaitingRoom {
    entries: Vec<WaitingEntry>,
}

impl WaitingRoom {
    /// Create an empty room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find, remove, and return the first entry whose identifier
    /// differs from `peer_id` and whose connection is still open.
    ///
    /// Entries referencing closed connections are pruned as they are
    /// encountered, never returned. A self-match is never produced.
    pub fn try_match(&mut self, peer_id: &str) -> Option<WaitingEntry> {
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].peer_id == peer_id {
                i += 1;
                continue;
            }
            if !self.entries[i].conn.is_open() {
                let _ = self.entries.remove(i);
                continue;
            }
            return Some(self.entries.remove(i));
        }
        None
    }

    /// Upsert: replace any existing entry for `peer_id`, refreshing
    /// its timestamp and connection reference in place (the entry
    /// keeps its position in the candidate order). Supports
    /// reconnect-while-waiting.
    pub fn enqueue(&mut self, peer_id: &str, conn: Arc<PeerConnection>) {
        let now = Instant::now();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.peer_id == peer_id) {
            entry.enqueued_at = now;
            entry.conn = conn;
            return;
        }
        self.entries.push(WaitingEntry {
            peer_id: peer_id.to_string(),
            enqueued_at: now,
            conn,
        });
    }

    /// Put a matched-but-undelivered entry back at the head of the
    /// candidate order, keeping its original timestamp.
    pub fn restore(&mut self, entry: WaitingEntry) {
        self.entries.insert(0, entry);
    }

    /// Idempotent removal by identifier. Returns whether an entry
    /// existed.
    pub fn remove(&mut self, peer_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.peer_id != peer_id);
        self.entries.len() != before
    }

    /// Remove the entry for `peer_id` only if it is owned by the
    /// given connection. Used on rebind so a binding stolen by a
    /// newer connection is not evicted by the old one.
    pub fn remove_owned_by(&mut self, peer_id: &str, conn_id: &ConnectionId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.peer_id == peer_id && e.conn.id == *conn_id));
        self.entries.len() != before
    }

    /// Remove any entry referencing the given connection, returning
    /// its identifier. Called on connection teardown.
    pub fn remove_connection(&mut self, conn_id: &ConnectionId) -> Option<String> {
        let pos = self.entries.iter().position(|e| e.conn.id == *conn_id)?;
        Some(self.entries.remove(pos).peer_id)
    }

    /// Remove and return every entry whose age exceeds `ttl`, for
    /// notification by the caller. Sweeping an empty room is a no-op.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<WaitingEntry> {
        let (expired, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| now.duration_since(e.enqueued_at) > ttl);
        self.entries = kept;
        expired
    }

    /// Whether `peer_id` is currently waiting.
    pub fn contains(&self, peer_id: &str) -> bool {
        self.entries.iter().any(|e| e.peer_id == peer_id)
    }

    /// Number of waiting entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the room is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
