//! The envelope: one discrete unit of inter-participant communication.
//!
//! Wire field names (`message_type`, `sender`, `receiver`, `content`,
//! `communication_round`, `timestamp`) are fixed by the protocol.
//! Envelopes are immutable value objects constructed per send and
//! discarded after handling, and carry a total order keyed on
//! (timestamp, round) for higher-level reordering policies.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{COORDINATOR_ID, JOIN_IP_KEY, JOIN_PORT_KEY, MODEL_KEY};
use crate::error::EncodingError;
use crate::value::{encode_blob, DictKey, GenericValue};

/// Envelope type discriminant. The reserved values cover the round
/// protocol; the space is open for extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(pub i32);

impl MessageType {
    /// Worker announces itself and its listen address.
    pub const JOIN: MessageType = MessageType(100);
    /// Coordinator tells workers the protocol is over.
    pub const TERMINATE: MessageType = MessageType(101);
    /// A model payload, in either direction.
    pub const PAYLOAD: MessageType = MessageType(201);
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageType::JOIN => write!(f, "JOIN"),
            MessageType::TERMINATE => write!(f, "TERMINATE"),
            MessageType::PAYLOAD => write!(f, "PAYLOAD"),
            MessageType(other) => write!(f, "{other}"),
        }
    }
}

/// Envelope routing: the whole directory, or an explicit id list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Receiver {
    /// Deliver to every directory entry. Serialized by omitting the
    /// receiver field entirely.
    #[default]
    Broadcast,
    /// Deliver to the listed participant ids.
    Unicast(Vec<String>),
}

impl Receiver {
    pub fn unicast(id: impl Into<String>) -> Self {
        Receiver::Unicast(vec![id.into()])
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Receiver::Broadcast)
    }
}

impl Serialize for Receiver {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Receiver::Broadcast => serializer.serialize_none(),
            Receiver::Unicast(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Receiver {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The wire accepts a bare id string, an id list, or nothing.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<Wire>::deserialize(deserializer)? {
            None => Receiver::Broadcast,
            Some(Wire::One(id)) => Receiver::Unicast(vec![id]),
            Some(Wire::Many(ids)) => Receiver::Unicast(ids),
        })
    }
}

/// One unit of communication between participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_type: MessageType,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Receiver::is_broadcast")]
    pub receiver: Receiver,
    pub content: GenericValue,
    pub communication_round: u32,
    /// Creation wall-clock time, seconds since the Unix epoch.
    pub timestamp: f64,
}

impl Envelope {
    /// Construct an envelope stamped with the current wall clock.
    pub fn new(
        message_type: MessageType,
        sender: impl Into<String>,
        receiver: Receiver,
        content: GenericValue,
        communication_round: u32,
    ) -> Self {
        Self {
            message_type,
            sender: sender.into(),
            receiver,
            content,
            communication_round,
            timestamp: now_secs(),
        }
    }

    /// A worker's join announcement carrying its own listen address.
    pub fn join(sender: impl Into<String>, host: &str, port: u16) -> Result<Self, EncodingError> {
        let content = GenericValue::dict([
            (DictKey::from(JOIN_IP_KEY), GenericValue::str(host)),
            (DictKey::from(JOIN_PORT_KEY), GenericValue::int(port as i64)),
        ])?;
        Ok(Self::new(
            MessageType::JOIN,
            sender,
            Receiver::unicast(COORDINATOR_ID),
            content,
            0,
        ))
    }

    /// The coordinator's termination signal, broadcast to the directory.
    pub fn terminate() -> Self {
        Self::new(
            MessageType::TERMINATE,
            COORDINATOR_ID,
            Receiver::Broadcast,
            GenericValue::str(""),
            0,
        )
    }

    /// A model payload envelope with the blob under the `"model"` key.
    pub fn payload(
        sender: impl Into<String>,
        receiver: Receiver,
        model: &[u8],
        communication_round: u32,
    ) -> Result<Self, EncodingError> {
        let content = GenericValue::dict([(DictKey::from(MODEL_KEY), encode_blob(model))])?;
        Ok(Self::new(
            MessageType::PAYLOAD,
            sender,
            receiver,
            content,
            communication_round,
        ))
    }

    /// The model bytes under the `"model"` content key, if present.
    pub fn model_bytes(&self) -> Option<&[u8]> {
        self.content
            .as_dict()
            .and_then(|d| d.get(MODEL_KEY))
            .and_then(|v| v.as_bytes())
    }
}

// Ordering and equality consider only the (timestamp, round) key.
impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Envelope {}

impl PartialOrd for Envelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Envelope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then(self.communication_round.cmp(&other.communication_round))
    }
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}
