//! Node configuration: TOML file plus CLI overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fedround_network::TransportConfig;

use crate::error::NodeError;

/// Configuration shared by both node roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This participant's id. `"0"` is reserved for the coordinator.
    pub id: String,
    /// The coordinator's rendezvous address, `host:port`.
    pub coordinator_address: String,
    /// Number of workers the coordinator waits for before round one.
    pub worker_count: usize,
    /// Number of broadcast/collect rounds before termination.
    pub round_budget: u32,
    /// Ceiling on the join phase.
    pub join_timeout_secs: u64,
    /// Ceiling on each collect phase.
    pub collect_timeout_secs: u64,
    /// Transport knobs.
    pub transport: TransportConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            coordinator_address: "127.0.0.1:50051".to_string(),
            worker_count: 2,
            round_budget: 2,
            join_timeout_secs: 300,
            collect_timeout_secs: 300,
            transport: TransportConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| NodeError::Config(format!("parse {}: {e}", path.display())))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs)
    }
}
