//! The worker loop state machine.
//!
//! JOINING: announce this worker's listen address to the coordinator,
//! fire-and-forget. SERVING: for each payload, restore the model, run
//! one local update, and echo the result back with the same round
//! number; a terminate envelope ends the loop. Replies are sent only
//! for payload envelopes; anything else is logged and dropped.

use std::str::FromStr;

use fedround_network::{PeerAddr, TcpTransport};
use fedround_protocol::{Envelope, MessageType, Receiver, COORDINATOR_ID};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::model::ModelState;

/// What a completed worker run looked like.
#[derive(Debug)]
pub struct WorkerSummary {
    /// Payload envelopes served (deserialize + update + reply).
    pub rounds_served: u32,
}

pub struct Worker<M: ModelState> {
    config: NodeConfig,
    transport: TcpTransport,
    model: M,
}

impl<M: ModelState> Worker<M> {
    pub fn new(config: NodeConfig, model: M) -> Self {
        let transport = TcpTransport::new(config.transport.clone());
        Self {
            config,
            transport,
            model,
        }
    }

    /// Run until the coordinator sends TERMINATE.
    pub async fn run(mut self) -> Result<WorkerSummary, NodeError> {
        self.transport.start().await?;
        self.join().await?;
        let summary = self.serve().await?;
        self.transport.stop();
        tracing::info!(rounds_served = summary.rounds_served, "worker stopped");
        Ok(summary)
    }

    /// JOINING: one join envelope to the coordinator. No acknowledgement
    /// beyond transport delivery is awaited, but a join that cannot be
    /// delivered at all is fatal — the coordinator would never learn
    /// this worker exists.
    async fn join(&mut self) -> Result<(), NodeError> {
        let coordinator = PeerAddr::from_str(&self.config.coordinator_address)
            .map_err(|e| NodeError::Config(format!("coordinator_address: {e}")))?;
        self.transport
            .register_peer(COORDINATOR_ID, coordinator)
            .await;

        let local = self.transport.local_addr()?;
        let join = Envelope::join(&self.config.id, &local.ip().to_string(), local.port())?;
        let mut report = self.transport.send(&join).await?;
        if let Some((_, error)) = report.failed.pop() {
            return Err(error.into());
        }
        tracing::info!(id = %self.config.id, addr = %local, "joined the coordinator");
        Ok(())
    }

    /// SERVING: receive, update, echo — until terminated.
    async fn serve(&mut self) -> Result<WorkerSummary, NodeError> {
        let mut rounds_served = 0;
        loop {
            let envelope = self.transport.receive().await?;
            match envelope.message_type {
                MessageType::TERMINATE => {
                    tracing::info!("terminate received");
                    break;
                }
                MessageType::PAYLOAD => match envelope.model_bytes() {
                    Some(bytes) => {
                        self.model.deserialize(bytes)?;
                        self.model.update();
                        self.reply(envelope.communication_round).await?;
                        rounds_served += 1;
                    }
                    None => {
                        tracing::warn!(
                            sender = %envelope.sender,
                            "payload envelope without a model entry dropped"
                        );
                    }
                },
                other => {
                    tracing::debug!(message_type = %other, "unexpected envelope dropped");
                }
            }
        }
        Ok(WorkerSummary { rounds_served })
    }

    /// Echo the updated model back to the coordinator, carrying the
    /// round number of the payload being answered.
    async fn reply(&mut self, round: u32) -> Result<(), NodeError> {
        let blob = self.model.serialize();
        let reply = Envelope::payload(
            &self.config.id,
            Receiver::unicast(COORDINATOR_ID),
            &blob,
            round,
        )?;
        let report = self.transport.send(&reply).await?;
        if !report.all_delivered() {
            tracing::warn!(round, "reply to the coordinator failed");
        } else {
            tracing::info!(round, bytes = blob.len(), "model update sent");
        }
        Ok(())
    }
}
