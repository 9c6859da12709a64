//! FedRound protocol - envelope and generic value definitions
//!
//! Defines the unit of communication (the [`Envelope`]) and the closed
//! recursive value type ([`GenericValue`]) that envelope content is
//! expressed in, together with the opaque-blob codec used for model
//! payloads.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod value;

pub use constants::*;
pub use envelope::{Envelope, MessageType, Receiver};
pub use error::EncodingError;
pub use value::{decode_blob, decode_payload, encode_blob, Dict, DictKey, GenericValue, Scalar};
