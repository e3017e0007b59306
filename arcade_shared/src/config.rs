//! Client configuration.
//!
//! Loaded from JSON strings/files (file IO left to the app). Keys use the
//! wire's camelCase convention.

use serde::{Deserialize, Serialize};

/// Recognized client options.
///
/// `reconnectAttempts` and `reconnectDelayMs` are accepted for forward
/// compatibility but unused: the connection manager performs no automatic
/// reconnection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Server address, e.g. `127.0.0.1:40000`.
    pub server_url: String,
    /// Lobby to join on connect.
    #[serde(default = "default_lobby")]
    pub lobby: String,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_input_sample_rate_hz")]
    pub input_sample_rate_hz: u32,
    #[serde(default)]
    pub reconnect_attempts: u32,
    #[serde(default)]
    pub reconnect_delay_ms: u64,
}

fn default_lobby() -> String {
    "default".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    3000
}

fn default_input_sample_rate_hz() -> u32 {
    15
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "127.0.0.1:40000".to_string(),
            lobby: default_lobby(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            input_sample_rate_hz: default_input_sample_rate_hz(),
            reconnect_attempts: 0,
            reconnect_delay_ms: 0,
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_keys() {
        let cfg = ClientConfig::from_json_str(r#"{"serverUrl":"10.0.0.1:5000"}"#).unwrap();
        assert_eq!(cfg.server_url, "10.0.0.1:5000");
        assert_eq!(cfg.lobby, "default");
        assert_eq!(cfg.heartbeat_interval_ms, 3000);
        assert_eq!(cfg.input_sample_rate_hz, 15);
    }

    #[test]
    fn reconnect_keys_are_accepted() {
        let cfg = ClientConfig::from_json_str(
            r#"{"serverUrl":"s:1","reconnectAttempts":3,"reconnectDelayMs":250}"#,
        )
        .unwrap();
        assert_eq!(cfg.reconnect_attempts, 3);
        assert_eq!(cfg.reconnect_delay_ms, 250);
    }
}
