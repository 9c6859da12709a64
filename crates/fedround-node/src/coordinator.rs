//! The round coordinator state machine.
//!
//! Phases: AWAITING_JOIN, then (BROADCAST, COLLECT) once per round in
//! the budget, then TERMINATED. Join and collect waits are bounded;
//! expiry surfaces [`NodeError::PhaseTimeout`] instead of stalling the
//! machine forever.

use std::collections::HashSet;

use tokio::time::Instant;

use fedround_network::{PeerAddr, TcpTransport, TransportError};
use fedround_protocol::{
    Envelope, GenericValue, MessageType, Receiver, Scalar, COORDINATOR_ID, JOIN_IP_KEY,
    JOIN_PORT_KEY,
};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::model::ModelState;

/// What a completed coordinator run looked like.
#[derive(Debug)]
pub struct CoordinatorSummary {
    pub workers: usize,
    pub rounds_completed: u32,
}

/// Drives the join, round, and termination phases. Run by the
/// participant holding the reserved id `"0"`.
pub struct Coordinator<M: ModelState> {
    config: NodeConfig,
    transport: TcpTransport,
    model: M,
}

impl<M: ModelState> Coordinator<M> {
    pub fn new(config: NodeConfig, model: M) -> Self {
        let transport = TcpTransport::new(config.transport.clone());
        Self {
            config,
            transport,
            model,
        }
    }

    /// Run the protocol to completion.
    pub async fn run(mut self) -> Result<CoordinatorSummary, NodeError> {
        self.transport.start().await?;
        self.await_joins().await?;

        let mut rounds_completed = 0;
        for round in 0..self.config.round_budget {
            tracing::info!(round, "starting round");
            self.broadcast(round).await?;
            self.collect(round).await?;
            rounds_completed += 1;
        }

        self.terminate().await?;
        Ok(CoordinatorSummary {
            workers: self.config.worker_count,
            rounds_completed,
        })
    }

    /// AWAITING_JOIN: register workers until the directory holds the
    /// configured count. Duplicate joins re-register the same id and do
    /// not advance the count; other envelope types are ignored.
    async fn await_joins(&mut self) -> Result<(), NodeError> {
        let deadline = Instant::now() + self.config.join_timeout();
        while self.transport.peer_count().await < self.config.worker_count {
            let envelope = self.recv_phase(deadline, "join").await?;
            if envelope.message_type != MessageType::JOIN {
                tracing::debug!(
                    message_type = %envelope.message_type,
                    sender = %envelope.sender,
                    "ignoring non-join envelope during join phase"
                );
                continue;
            }
            match join_peer_addr(&envelope) {
                Ok(addr) => {
                    tracing::info!(worker = %envelope.sender, addr = %addr, "worker joined");
                    self.transport.register_peer(&envelope.sender, addr).await;
                }
                Err(e) => {
                    tracing::warn!(sender = %envelope.sender, error = %e, "bad join envelope");
                }
            }
        }
        tracing::info!(workers = self.config.worker_count, "join phase complete");
        Ok(())
    }

    /// BROADCAST: push the model's current state to every worker.
    async fn broadcast(&mut self, round: u32) -> Result<(), NodeError> {
        let blob = self.model.serialize();
        let envelope = Envelope::payload(COORDINATOR_ID, Receiver::Broadcast, &blob, round)?;
        let report = self.transport.send(&envelope).await?;
        if !report.all_delivered() {
            tracing::warn!(
                round,
                failed = report.failed.len(),
                "broadcast did not reach every worker"
            );
        }
        tracing::info!(round, bytes = blob.len(), "model broadcast");
        Ok(())
    }

    /// COLLECT: count payload acks, deduplicated by sender, for the
    /// current round only. Stale rounds and duplicates are discarded.
    async fn collect(&mut self, round: u32) -> Result<(), NodeError> {
        let deadline = Instant::now() + self.config.collect_timeout();
        let mut acked: HashSet<String> = HashSet::new();
        while acked.len() < self.config.worker_count {
            let envelope = self.recv_phase(deadline, "collect").await?;
            if envelope.message_type != MessageType::PAYLOAD {
                tracing::debug!(
                    message_type = %envelope.message_type,
                    "ignoring non-payload envelope during collect"
                );
                continue;
            }
            if envelope.communication_round != round {
                tracing::debug!(
                    round,
                    envelope_round = envelope.communication_round,
                    sender = %envelope.sender,
                    "discarding stale-round payload"
                );
                continue;
            }
            if acked.insert(envelope.sender.clone()) {
                tracing::info!(round, worker = %envelope.sender, "worker updated the model");
            } else {
                tracing::debug!(round, worker = %envelope.sender, "duplicate ack discarded");
            }
        }
        Ok(())
    }

    /// TERMINATED: tell every worker to stop, then stop listening.
    async fn terminate(&mut self) -> Result<(), NodeError> {
        let report = self.transport.send(&Envelope::terminate()).await?;
        if !report.all_delivered() {
            tracing::warn!(failed = report.failed.len(), "terminate did not reach every worker");
        }
        self.transport.stop();
        tracing::info!("coordinator terminated");
        Ok(())
    }

    async fn recv_phase(
        &mut self,
        deadline: Instant,
        phase: &'static str,
    ) -> Result<Envelope, NodeError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(NodeError::PhaseTimeout { phase });
        }
        match self.transport.recv_timeout(remaining).await {
            Ok(envelope) => Ok(envelope),
            Err(TransportError::Timeout) => Err(NodeError::PhaseTimeout { phase }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read the advertised listen address out of a JOIN envelope's content.
/// The port is accepted as an integer or a numeric string.
fn join_peer_addr(envelope: &Envelope) -> Result<PeerAddr, NodeError> {
    let dict = envelope
        .content
        .as_dict()
        .ok_or_else(|| NodeError::MalformedEnvelope("join content is not a dict".into()))?;
    let host = match dict.get(JOIN_IP_KEY) {
        Some(GenericValue::Single(Scalar::Str(host))) => host.clone(),
        _ => return Err(NodeError::MalformedEnvelope("join is missing an ip".into())),
    };
    let port = match dict.get(JOIN_PORT_KEY) {
        Some(GenericValue::Single(Scalar::Int(port))) => u16::try_from(*port)
            .map_err(|_| NodeError::MalformedEnvelope(format!("port {port} out of range")))?,
        Some(GenericValue::Single(Scalar::Str(port))) => port
            .parse::<u16>()
            .map_err(|e| NodeError::MalformedEnvelope(format!("bad port: {e}")))?,
        _ => return Err(NodeError::MalformedEnvelope("join is missing a port".into())),
    };
    Ok(PeerAddr::new(host, port))
}
