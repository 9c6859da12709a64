//! Transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Channel compression applied to frame bodies. A pass-through knob:
/// both ends of a deployment must agree on the setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Deflate,
}

/// Configuration for the TCP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Address the inbound listener binds to.
    pub bind_address: String,
    /// Maximum concurrent inbound connections.
    pub max_connections: usize,
    /// Total delivery attempts per destination before giving up.
    pub max_retry_attempts: u32,
    /// Backoff before the second attempt; doubles each attempt.
    pub retry_base_delay_ms: u64,
    /// Send/receive ceiling on a frame body, in bytes.
    pub message_size_limit: usize,
    /// Compression applied to frame bodies.
    pub compression: Compression,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_string(),
            max_connections: 16,
            max_retry_attempts: 3,
            retry_base_delay_ms: 1_000,
            message_size_limit: 1_000 * 1024 * 1024,
            compression: Compression::None,
        }
    }
}

impl TransportConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
