//! Join/leave handling and pair formation.

use std::sync::Arc;

use beacon_protocol::ServerMessage;
use tracing::{debug, info, warn};

use crate::connection::PeerConnection;
use crate::error::RelayError;
use crate::state::RelayState;

/// Handle a `join` request.
///
/// Binds the identifier, then either pairs the joiner with the oldest
/// compatible waiter (joiner is the initiator) or enqueues it. If a
/// match notification cannot be delivered to either side, the match is
/// treated as not having happened: the counterpart goes back to the
/// head of the room (if still open) and the joiner is enqueued, so a
/// join request is never silently dropped.
pub fn handle_join(
    state: &mut RelayState,
    conn: &Arc<PeerConnection>,
    peer_id: Option<String>,
) -> Result<(), RelayError> {
    let peer_id = match peer_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(RelayError::Validation("peerId is required".into())),
    };

    // Rebind releases the old identifier: reverse index first (inside
    // bind), then the old identifier's waiting entry if this
    // connection still owns it.
    if let Some(old_id) = state.registry.bind(&conn.id, &peer_id) {
        if state.waiting.remove_owned_by(&old_id, &conn.id) {
            debug!(conn_id = %conn.id, old_peer_id = %old_id, "rebind evicted old waiting entry");
        }
    }

    if let Some(counterpart) = state.waiting.try_match(&peer_id) {
        let to_joiner = conn.send_msg(&ServerMessage::matched(counterpart.peer_id.clone(), true));
        let to_counterpart = counterpart
            .conn
            .send_msg(&ServerMessage::matched(peer_id.clone(), false));

        if to_joiner && to_counterpart {
            info!(peer_id = %peer_id, counterpart = %counterpart.peer_id, "match formed");
            return Ok(());
        }

        // Delivery failed on at least one side: the match did not
        // happen. The counterpart keeps its place in line if its
        // connection is still usable.
        warn!(
            peer_id = %peer_id,
            counterpart = %counterpart.peer_id,
            "match delivery failed, falling back to waiting room"
        );
        if counterpart.conn.is_open() && to_counterpart {
            state.waiting.restore(counterpart);
        }
    }

    state.waiting.enqueue(&peer_id, Arc::clone(conn));
    let _ = conn.send_msg(&ServerMessage::waiting());
    debug!(peer_id = %peer_id, waiting = state.waiting.len(), "peer enqueued");
    Ok(())
}

/// Handle a `leave` request: drop the identifier's waiting entry if
/// present, and acknowledge unconditionally.
pub fn handle_leave(
    state: &mut RelayState,
    conn: &Arc<PeerConnection>,
    peer_id: Option<String>,
) -> Result<(), RelayError> {
    let peer_id = match peer_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(RelayError::Validation("peerId is required".into())),
    };

    if state.waiting.remove(&peer_id) {
        info!(peer_id = %peer_id, "peer left waiting room");
    }
    let _ = conn.send_msg(&ServerMessage::left());
    Ok(())
}
