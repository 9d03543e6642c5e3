//! HTTP/WebSocket surface and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use beacon_protocol::ServerMessage;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::session;
use crate::shutdown::ShutdownCoordinator;
use crate::state::{RelayState, SharedState};

/// Router state shared by the handlers.
#[derive(Clone)]
struct AppState {
    state: SharedState,
    config: Arc<ServerConfig>,
    shutdown: Arc<ShutdownCoordinator>,
}

/// The signaling relay server.
pub struct BeaconServer {
    config: Arc<ServerConfig>,
    state: SharedState,
    shutdown: Arc<ShutdownCoordinator>,
}

/// A running server: its bound address and background tasks.
pub struct ServerHandle {
    /// Address actually bound (resolves port `0`).
    pub addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl BeaconServer {
    /// Create a server from configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: RelayState::shared(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Shared handle to the relay state.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// The HTTP router: `GET /ws` upgrades, `GET /health` reports.
    pub fn router(&self) -> Router {
        let app = AppState {
            state: self.state.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.clone(),
        };
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(app)
    }

    /// Bind, start serving, and start the liveness sweeper.
    pub async fn listen(&self) -> anyhow::Result<ServerHandle> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        let sweeper = crate::liveness::spawn_sweeper(
            self.state.clone(),
            self.config.probe_interval(),
            self.config.waiting_ttl(),
            self.shutdown.token(),
        );

        let app = self.router();
        let token = self.shutdown.token();
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(token.cancelled_owned());
            if let Err(err) = serve.await {
                error!(%err, "server error");
            }
        });

        Ok(ServerHandle {
            addr,
            tasks: vec![server, sweeper],
        })
    }

    /// Notify every open connection that the server is going away and
    /// close it. Waiting entries go with their connections.
    pub fn close_all_connections(&self) {
        let guard = self.state.lock();
        let connections = guard.registry.connections();
        info!(count = connections.len(), "closing all connections");
        for conn in connections {
            let _ = conn.send_msg(&ServerMessage::server_closing());
            conn.close();
        }
    }

    /// Full shutdown: notify clients, stop accepting, and wait up to
    /// the configured grace period for tasks to finish.
    pub async fn shutdown_gracefully(&self, handle: ServerHandle) -> bool {
        self.close_all_connections();
        self.shutdown
            .graceful_shutdown(handle.tasks, self.config.shutdown_grace())
            .await
    }
}

async fn ws_handler(State(app): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    if app.shutdown.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let state = app.state.clone();
    let queue = app.config.send_queue_size;
    ws.max_message_size(app.config.max_message_size)
        .on_upgrade(move |socket| session::run_session(socket, state, queue))
        .into_response()
}

async fn health_handler(State(app): State<AppState>) -> Json<HealthResponse> {
    Json(health::snapshot(&app.state))
}
