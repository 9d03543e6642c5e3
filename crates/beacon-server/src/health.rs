//! Health endpoint payload.

use serde::{Deserialize, Serialize};

use crate::state::SharedState;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: String,
    /// Open connections.
    pub connections: usize,
    /// Peers in the waiting room.
    pub waiting: usize,
}

/// Snapshot the current counts.
pub fn snapshot(state: &SharedState) -> HealthResponse {
    let guard = state.lock();
    HealthResponse {
        status: "healthy".into(),
        connections: guard.registry.len(),
        waiting: guard.waiting.len(),
    }
}
