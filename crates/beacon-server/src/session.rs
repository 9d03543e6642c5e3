//! One task pair per WebSocket session.

use axum::extract::ws::{Message, WebSocket};
use beacon_protocol::ServerMessage;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::connection::{Outbound, PeerConnection};
use crate::dispatch::dispatch;
use crate::state::SharedState;

/// Drive a WebSocket session to completion.
///
/// The socket is split: a writer task drains the connection's outbound
/// queue onto the wire, while this task reads inbound frames and
/// routes them. Both halves watch the connection's cancellation token
/// so a forced termination (liveness sweep, shutdown) unblocks a
/// reader that would otherwise wait on a silent peer forever.
pub async fn run_session(socket: WebSocket, state: SharedState, send_queue_size: usize) {
    let (tx, mut rx) = mpsc::channel(send_queue_size);
    let conn = PeerConnection::shared(tx);
    state.lock().accept(conn.clone());
    info!(conn_id = %conn.id, "connection accepted");

    let _ = conn.send_msg(&ServerMessage::connected());

    let (mut ws_tx, mut ws_rx) = socket.split();
    let cancel = conn.closed_token();

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            // Biased so queued frames (a shutdown notice, the close
            // marker) are flushed before cancellation is observed.
            tokio::select! {
                biased;
                item = rx.recv() => match item {
                    Some(Outbound::Text(text)) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Probe) => {
                        if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(&state, &conn, text.as_str()),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => dispatch(&state, &conn, text),
                    Err(_) => {
                        let _ = conn.send_msg(&ServerMessage::error("Invalid message format"));
                    }
                },
                // Answer to our liveness probe.
                Some(Ok(Message::Pong(_))) => conn.mark_alive(),
                // The transport layer answers client Pings itself.
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    debug!(conn_id = %conn.id, %err, "socket error");
                    break;
                }
            }
        }
    }

    // Teardown in one locked step, then wake the writer.
    state.lock().purge_connection(&conn.id);
    conn.close();
    let _ = writer.await;
    info!(conn_id = %conn.id, "session ended");
}
