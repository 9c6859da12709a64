use thiserror::Error;

use fedround_network::TransportError;
use fedround_protocol::EncodingError;

/// Errors surfaced by the node state machines.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A bounded protocol phase expired before completing.
    #[error("{phase} phase timed out")]
    PhaseTimeout { phase: &'static str },

    /// An envelope was missing a field the protocol requires.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("configuration error: {0}")]
    Config(String),
}
