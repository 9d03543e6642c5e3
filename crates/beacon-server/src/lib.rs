//! # beacon-server
//!
//! A real-time signaling relay. Clients hold persistent WebSocket
//! connections, register a peer identifier, get paired one-to-one with
//! another waiting client, and exchange opaque negotiation payloads
//! until they can talk directly.
//!
//! - Connection registry with a `peerId → connection` reverse index
//! - Insertion-ordered waiting room with TTL expiry
//! - Blind signal relay (payloads are never inspected)
//! - Two-tick Ping/Pong liveness sweep
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`
//!
//! All registry and waiting-room mutation is serialized behind a
//! single mutex ([`state::RelayState`]); handlers never await while
//! holding it and all sends are fire-and-forget.

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod liveness;
pub mod matchmaker;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod waiting;

pub use config::ServerConfig;
pub use error::RelayError;
pub use server::{BeaconServer, ServerHandle};
