//! Opaque signal forwarding between bound peers.

use std::sync::Arc;

use beacon_protocol::ServerMessage;
use serde_json::Value;
use tracing::debug;

use crate::connection::PeerConnection;
use crate::error::RelayError;
use crate::state::RelayState;

/// Forward an opaque payload to the connection bound to
/// `target_peer_id`.
///
/// The payload is never inspected. The sender's own bound identifier
/// rides along as `fromPeerId` when it has one; an unbound sender may
/// still relay, the field is simply omitted.
pub fn handle_signal(
    state: &RelayState,
    conn: &Arc<PeerConnection>,
    target_peer_id: Option<String>,
    signal: Option<Value>,
) -> Result<(), RelayError> {
    let (target, payload) = match (target_peer_id, signal) {
        (Some(t), Some(p)) if !t.is_empty() => (t, p),
        _ => return Err(RelayError::Validation("Invalid signal data".into())),
    };

    let recipient = state
        .registry
        .lookup_by_peer(&target)
        .ok_or(RelayError::TargetNotFound)?;

    if !recipient.send_msg(&ServerMessage::signal(payload, conn.peer_id())) {
        return Err(RelayError::Transport(recipient.id.clone()));
    }
    debug!(target = %target, "signal relayed");
    Ok(())
}
