//! The external payload collaborator.
//!
//! The node never interprets model bytes; it only moves them. Anything
//! that can flatten itself to bytes and restore from them can ride the
//! protocol.

use crate::error::NodeError;

/// The payload producer/consumer seam.
pub trait ModelState: Send {
    /// Flatten the current state to opaque bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Restore state from opaque bytes.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), NodeError>;

    /// One local update step between receiving and replying. What this
    /// does is entirely up to the collaborator.
    fn update(&mut self);
}

/// A demo model: an opaque byte buffer whose update step perturbs the
/// first byte and counts revisions. Stands in for a real model in the
/// binary and in tests.
#[derive(Debug, Clone, Default)]
pub struct ByteModel {
    data: Vec<u8>,
    revisions: u64,
}

impl ByteModel {
    pub fn seeded(data: Vec<u8>) -> Self {
        Self { data, revisions: 0 }
    }

    pub fn revisions(&self) -> u64 {
        self.revisions
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ModelState for ByteModel {
    fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn deserialize(&mut self, bytes: &[u8]) -> Result<(), NodeError> {
        self.data = bytes.to_vec();
        Ok(())
    }

    fn update(&mut self) {
        self.revisions += 1;
        if let Some(first) = self.data.first_mut() {
            *first = first.wrapping_add(1);
        }
    }
}
