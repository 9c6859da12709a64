//! FedRound node - the two role state machines
//!
//! The coordinator drives the join phase, a fixed number of
//! broadcast/collect rounds, and termination; workers register, then
//! echo updated payloads until told to stop. Both treat the model as an
//! opaque collaborator behind [`ModelState`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod worker;

pub use config::NodeConfig;
pub use coordinator::{Coordinator, CoordinatorSummary};
pub use error::NodeError;
pub use model::{ByteModel, ModelState};
pub use worker::{Worker, WorkerSummary};
