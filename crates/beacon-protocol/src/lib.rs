//! # beacon-protocol
//!
//! Wire messages exchanged between signaling clients and the beacon
//! relay. Everything on the wire is a single JSON object tagged by a
//! `type` field; field names are camelCase.
//!
//! The relayed negotiation payload (`signal`) is an uninterpreted
//! [`serde_json::Value`]; the relay never looks inside it.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent by clients to the relay.
///
/// Required fields are modeled as `Option` so that presence is
/// validated by the handlers (which report a protocol-level error
/// message) rather than by serde (which would reject the whole frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Register an identifier and request a match.
    Join {
        /// Self-reported peer identifier.
        #[serde(rename = "peerId", default)]
        peer_id: Option<String>,
    },
    /// Withdraw an identifier from the waiting room.
    Leave {
        /// Identifier to withdraw.
        #[serde(rename = "peerId", default)]
        peer_id: Option<String>,
    },
    /// Application-level keepalive; answered with `pong`.
    Ping,
    /// Relay an opaque negotiation payload to another peer.
    Signal {
        /// Identifier of the recipient.
        #[serde(rename = "targetPeerId", default)]
        target_peer_id: Option<String>,
        /// Opaque negotiation payload, forwarded verbatim.
        #[serde(default)]
        signal: Option<Value>,
    },
}

/// Messages sent by the relay to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Greeting sent once per accepted connection.
    Connected {
        /// Human-readable greeting.
        message: String,
    },
    /// The joiner was placed in the waiting room.
    Waiting {
        /// Human-readable status.
        message: String,
    },
    /// A one-to-one pairing was produced.
    Match {
        /// The counterpart's identifier.
        #[serde(rename = "peerId")]
        peer_id: String,
        /// Whether this side starts the post-match negotiation.
        initiator: bool,
    },
    /// Acknowledgement of a leave request.
    Left {
        /// Human-readable status.
        message: String,
    },
    /// Answer to an application-level `ping`.
    Pong,
    /// A relayed negotiation payload.
    Signal {
        /// The payload, forwarded verbatim.
        signal: Value,
        /// The sender's bound identifier, if it has one.
        #[serde(rename = "fromPeerId", skip_serializing_if = "Option::is_none")]
        from_peer_id: Option<String>,
    },
    /// The waiting-room entry expired before a match was found.
    Timeout,
    /// A request was rejected; the connection stays open.
    Error {
        /// What went wrong.
        message: String,
    },
    /// The server is shutting down and will close the connection.
    ServerClosing {
        /// Human-readable notice.
        message: String,
    },
}

impl ServerMessage {
    /// The greeting sent to every accepted connection.
    pub fn connected() -> Self {
        Self::Connected {
            message: "Connected to signaling server".into(),
        }
    }

    /// The waiting-room acknowledgement.
    pub fn waiting() -> Self {
        Self::Waiting {
            message: "Waiting for a match...".into(),
        }
    }

    /// A match notification for one side of a pairing.
    pub fn matched(peer_id: impl Into<String>, initiator: bool) -> Self {
        Self::Match {
            peer_id: peer_id.into(),
            initiator,
        }
    }

    /// The leave acknowledgement.
    pub fn left() -> Self {
        Self::Left {
            message: "You have left the waiting room".into(),
        }
    }

    /// A relayed payload with the sender's identifier attached.
    pub fn signal(signal: Value, from_peer_id: Option<String>) -> Self {
        Self::Signal {
            signal,
            from_peer_id,
        }
    }

    /// An error report.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The shutdown notice.
    pub fn server_closing() -> Self {
        Self::ServerClosing {
            message: "Server is shutting down".into(),
        }
    }
}
