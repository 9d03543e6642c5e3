//! Relay error taxonomy.
//!
//! No variant is fatal to the process: validation, lookup, and
//! transport failures are reported (or logged) per connection and the
//! server keeps running.

use crate::connection::ConnectionId;

/// Errors produced while handling a client request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A required field was missing or malformed. Reported to the
    /// sender; no state was mutated.
    #[error("{0}")]
    Validation(String),

    /// The relay target has no bound, open connection. Reported to
    /// the sender; no state was mutated.
    #[error("Target peer not found")]
    TargetNotFound,

    /// A send to one connection failed (queue full or closed). The
    /// failing connection is cleaned up on its own; never a
    /// process-level fault.
    #[error("failed to deliver to connection {0}")]
    Transport(ConnectionId),

    /// An inbound frame could not be parsed. Reported to the sender;
    /// the connection survives.
    #[error("Invalid message format")]
    Protocol,
}

impl RelayError {
    /// The message text reported to the client for this error.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::TargetNotFound => "Target peer not found".into(),
            Self::Protocol => "Invalid message format".into(),
            // Transport failures are never echoed back to the failing
            // connection; log-only.
            Self::Transport(_) => "Internal error".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_carries_message() {
        let err = RelayError::Validation("peerId is required".into());
        assert_eq!(err.client_message(), "peerId is required");
        assert_eq!(err.to_string(), "peerId is required");
    }

    #[test]
    fn target_not_found_message() {
        assert_eq!(
            RelayError::TargetNotFound.client_message(),
            "Target peer not found"
        );
    }

    #[test]
    fn protocol_message() {
        assert_eq!(
            RelayError::Protocol.client_message(),
            "Invalid message format"
        );
    }

    #[test]
    fn transport_displays_connection() {
        let id = ConnectionId::new();
        let err = RelayError::Transport(id.clone());
        assert!(err.to_string().contains(&id.to_string()));
    }
}
