//! Periodic liveness probing and waiting-room expiry.

use std::time::{Duration, Instant};

use beacon_protocol::ServerMessage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::state::SharedState;

/// What one sweep did, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Waiting entries evicted by TTL.
    pub expired: usize,
    /// Connections terminated for missing two consecutive probes.
    pub terminated: usize,
    /// Connections probed this tick.
    pub probed: usize,
}

/// Run one sweep over the relay state.
///
/// First evicts waiting entries older than `ttl` and notifies them,
/// then walks every connection: one that has not answered since the
/// previous sweep is terminated, the rest are probed. A connection
/// therefore survives one silent interval and is torn down on the
/// second.
pub fn sweep(state: &SharedState, ttl: Duration) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();
    let mut guard = state.lock();

    for entry in guard.waiting.sweep_expired(Instant::now(), ttl) {
        info!(peer_id = %entry.peer_id, "waiting entry expired");
        // Best effort; the peer may already be gone.
        let _ = entry.conn.send_msg(&ServerMessage::Timeout);
        outcome.expired += 1;
    }

    let mut dead = Vec::new();
    for conn in guard.registry.connections() {
        if conn.check_alive() {
            let _ = conn.send_probe();
            outcome.probed += 1;
        } else {
            dead.push(conn);
        }
    }
    for conn in dead {
        info!(conn_id = %conn.id, "unresponsive, terminating");
        guard.purge_connection(&conn.id);
        conn.close();
        outcome.terminated += 1;
    }

    debug!(
        probed = outcome.probed,
        terminated = outcome.terminated,
        expired = outcome.expired,
        waiting = guard.waiting.len(),
        "liveness sweep"
    );
    outcome
}

/// Spawn the sweep loop. Runs until `cancel` fires.
pub fn spawn_sweeper(
    state: SharedState,
    interval: Duration,
    ttl: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so freshly accepted
        // connections get a full interval before their first probe.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = sweep(&state, ttl);
                }
                _ = cancel.cancelled() => break,
            }
        }
        debug!("liveness sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Outbound, PeerConnection};
    use crate::state::RelayState;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn registered_conn(state: &SharedState) -> (Arc<PeerConnection>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = PeerConnection::shared(tx);
        state.lock().accept(conn.clone());
        (conn, rx)
    }

    #[test]
    fn responsive_connection_is_probed_not_terminated() {
        let state = RelayState::shared();
        let (conn, mut rx) = registered_conn(&state);

        let outcome = sweep(&state, Duration::from_secs(30));
        assert_eq!(outcome.probed, 1);
        assert_eq!(outcome.terminated, 0);
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Probe));

        // Answering the probe keeps the connection alive through the
        // next sweep.
        conn.mark_alive();
        let outcome = sweep(&state, Duration::from_secs(30));
        assert_eq!(outcome.probed, 1);
        assert_eq!(outcome.terminated, 0);
    }

    #[test]
    fn silent_connection_terminated_on_second_sweep() {
        let state = RelayState::shared();
        let (conn, _rx) = registered_conn(&state);

        let first = sweep(&state, Duration::from_secs(30));
        assert_eq!(first.terminated, 0);

        let second = sweep(&state, Duration::from_secs(30));
        assert_eq!(second.terminated, 1);
        assert!(!conn.is_open());
        assert!(state.lock().registry.is_empty());
    }

    #[test]
    fn terminated_waiter_is_purged_from_room() {
        let state = RelayState::shared();
        let (conn, _rx) = registered_conn(&state);
        {
            let mut guard = state.lock();
            let _ = guard.registry.bind(&conn.id, "alice");
            guard.waiting.enqueue("alice", conn.clone());
        }

        let _ = sweep(&state, Duration::from_secs(30));
        let _ = sweep(&state, Duration::from_secs(30));

        let guard = state.lock();
        assert!(guard.waiting.is_empty());
        assert!(guard.registry.lookup_by_peer("alice").is_none());
    }

    #[test]
    fn expired_waiter_gets_timeout_but_stays_connected() {
        let state = RelayState::shared();
        let (conn, mut rx) = registered_conn(&state);
        {
            let mut guard = state.lock();
            guard.waiting.enqueue("alice", conn.clone());
        }
        // Fresh entry survives a sweep with a generous TTL.
        let outcome = sweep(&state, Duration::from_secs(3600));
        assert_eq!(outcome.expired, 0);
        let _ = rx.try_recv(); // probe

        conn.mark_alive();
        // Zero TTL expires everything enqueued before this instant.
        let outcome = sweep(&state, Duration::ZERO);
        assert_eq!(outcome.expired, 1);

        let msg = match rx.try_recv().unwrap() {
            Outbound::Text(text) => text,
            other => panic!("unexpected outbound: {other:?}"),
        };
        assert!(msg.contains("timeout"));
        // Expiry evicts the waiting entry only; the connection stays.
        let guard = state.lock();
        assert!(guard.waiting.is_empty());
        assert!(conn.is_open());
        assert_eq!(guard.registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_ticks_and_stops_on_cancel() {
        let state = RelayState::shared();
        let (_conn, mut rx) = registered_conn(&state);
        let cancel = CancellationToken::new();

        let handle = spawn_sweeper(
            state.clone(),
            Duration::from_secs(10),
            Duration::from_secs(30),
            cancel.clone(),
        );

        // Let the spawned sweeper create its interval before the clock
        // moves, otherwise the tick is scheduled after the advance.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Probe));

        cancel.cancel();
        handle.await.unwrap();
    }
}
