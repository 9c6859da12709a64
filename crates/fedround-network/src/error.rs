use thiserror::Error;

use fedround_protocol::EncodingError;

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The destination id is absent from the peer directory.
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame body exceeded the configured message size limit.
    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: usize, limit: usize },

    /// Every delivery attempt to the destination failed.
    #[error("delivery to {peer} failed after {attempts} attempts")]
    RetriesExhausted { peer: String, attempts: u32 },

    /// The peer answered the delivery with something other than ACK.
    #[error("peer did not acknowledge the delivery")]
    NoAck,

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A bounded receive expired before an envelope arrived.
    #[error("timed out waiting for an envelope")]
    Timeout,

    /// The inbound queue is gone; the listener has stopped.
    #[error("inbound channel closed")]
    ChannelClosed,

    /// The transport was used before `start` was called.
    #[error("transport not started")]
    NotStarted,
}
