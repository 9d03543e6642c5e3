//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the beacon relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `10000`; `0` auto-assigns).
    pub port: u16,
    /// Seconds between liveness probe sweeps.
    pub probe_interval_secs: u64,
    /// Seconds a waiting-room entry may wait before it expires.
    pub waiting_ttl_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound send-queue capacity per connection.
    pub send_queue_size: usize,
    /// Seconds to wait for connections to close during shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 10000,
            probe_interval_secs: 10,
            waiting_ttl_secs: 30,
            max_message_size: 64 * 1024,
            send_queue_size: 256,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Interval between liveness sweeps.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    /// Waiting-room entry TTL.
    pub fn waiting_ttl(&self) -> Duration {
        Duration::from_secs(self.waiting_ttl_secs)
    }

    /// Shutdown grace period.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 10000);
    }

    #[test]
    fn default_probe_interval() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.probe_interval(), Duration::from_secs(10));
    }

    #[test]
    fn default_waiting_ttl() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.waiting_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn default_shutdown_grace() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.port, cfg.port);
        assert_eq!(back.probe_interval_secs, cfg.probe_interval_secs);
        assert_eq!(back.waiting_ttl_secs, cfg.waiting_ttl_secs);
        assert_eq!(back.max_message_size, cfg.max_message_size);
        assert_eq!(back.send_queue_size, cfg.send_queue_size);
        assert_eq!(back.shutdown_grace_secs, cfg.shutdown_grace_secs);
    }

    #[test]
    fn custom_values() {
        let cfg = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            probe_interval_secs: 1,
            waiting_ttl_secs: 2,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.probe_interval(), Duration::from_secs(1));
        assert_eq!(cfg.waiting_ttl(), Duration::from_secs(2));
    }
}
