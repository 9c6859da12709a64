//! Protocol-wide constants.

/// Reserved participant id of the coordinator.
pub const COORDINATOR_ID: &str = "0";

/// Content dict key under which the opaque model blob travels.
pub const MODEL_KEY: &str = "model";

/// Content dict keys carried by a JOIN envelope.
pub const JOIN_IP_KEY: &str = "ip";
pub const JOIN_PORT_KEY: &str = "port";
