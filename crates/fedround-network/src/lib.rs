//! FedRound network layer - peer directory and TCP transport
//!
//! The transport moves encoded envelopes between participants: an
//! outbound path with bounded retry and exponential backoff per
//! destination, and an inbound path where a semaphore-bounded listener
//! pool feeds a single shared FIFO queue consumed by the node's state
//! machine.

pub mod config;
pub mod directory;
pub mod error;
pub mod frame;
pub mod transport;

pub use config::{Compression, TransportConfig};
pub use directory::{PeerAddr, PeerDirectory};
pub use error::TransportError;
pub use transport::{SendReport, TcpTransport};
