//! The peer directory: participant id to network address.
//!
//! Entries are created on JOIN processing and persist for the process
//! lifetime; there is no leave protocol.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A participant's listen address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddr {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.rsplit_once(':').ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("address {s:?} is not host:port"),
            )
        })?;
        let port = port.parse::<u16>().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad port: {e}"))
        })?;
        Ok(PeerAddr::new(host, port))
    }
}

/// Mutable mapping from participant id to address. Ids are unique; the
/// coordinator's own id is reserved as `"0"`.
#[derive(Debug, Clone, Default)]
pub struct PeerDirectory {
    peers: HashMap<String, PeerAddr>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert. A repeated id replaces the stored address.
    pub fn add(&mut self, id: impl Into<String>, addr: PeerAddr) {
        self.peers.insert(id.into(), addr);
    }

    /// Resolve one id, failing with `UnknownPeer` if absent.
    pub fn resolve(&self, id: &str) -> Result<PeerAddr, TransportError> {
        self.peers
            .get(id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownPeer(id.to_string()))
    }

    /// Every known (id, address) entry.
    pub fn resolve_all(&self) -> Vec<(String, PeerAddr)> {
        self.peers
            .iter()
            .map(|(id, addr)| (id.clone(), addr.clone()))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
