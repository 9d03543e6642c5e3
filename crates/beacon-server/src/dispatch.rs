//! Inbound frame parsing and routing.

use std::sync::Arc;

use beacon_protocol::{ClientMessage, ServerMessage};
use tracing::{debug, warn};

use crate::connection::PeerConnection;
use crate::error::RelayError;
use crate::matchmaker;
use crate::relay;
use crate::state::SharedState;

/// Parse one text frame and route it to its handler.
///
/// Every failure is reported back to the sender as an `error` message
/// and the connection stays open; a bad frame never tears a session
/// down. The state lock is taken per request and released before any
/// await point (there are none here; all sends are fire-and-forget).
pub fn dispatch(state: &SharedState, conn: &Arc<PeerConnection>, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(err) => {
            debug!(conn_id = %conn.id, %err, "unparseable frame");
            report(conn, &RelayError::Protocol);
            return;
        }
    };

    let result = match msg {
        ClientMessage::Join { peer_id } => {
            matchmaker::handle_join(&mut state.lock(), conn, peer_id)
        }
        ClientMessage::Leave { peer_id } => {
            matchmaker::handle_leave(&mut state.lock(), conn, peer_id)
        }
        ClientMessage::Ping => {
            let _ = conn.send_msg(&ServerMessage::Pong);
            Ok(())
        }
        ClientMessage::Signal {
            target_peer_id,
            signal,
        } => relay::handle_signal(&state.lock(), conn, target_peer_id, signal),
    };

    if let Err(err) = result {
        report(conn, &err);
    }
}

/// Send the client-facing error text, except for transport failures,
/// which concern a different connection and are only logged.
fn report(conn: &Arc<PeerConnection>, err: &RelayError) {
    if let RelayError::Transport(failed) = err {
        warn!(conn_id = %conn.id, failed = %failed, "delivery failed");
        return;
    }
    let _ = conn.send_msg(&ServerMessage::error(err.client_message()));
}
