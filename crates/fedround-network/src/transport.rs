//! Bidirectional envelope exchange over TCP.
//!
//! Outbound: each destination resolved through the peer directory gets
//! its own connection per delivery — connect, write one frame, await the
//! ACK frame, close — with bounded retries and exponential backoff.
//! Exhaustion is surfaced to the caller in the [`SendReport`] rather
//! than swallowed.
//!
//! Inbound: an accept loop bounded by a connection semaphore decodes
//! each request into an envelope and appends it to one shared FIFO
//! queue; [`TcpTransport::receive`] pops the oldest entry, suspending
//! the caller until one arrives. The queue preserves arrival order; it
//! never reorders by envelope timestamp.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock, Semaphore};
use tokio::time::{sleep, timeout};

use fedround_protocol::{Envelope, Receiver};

use crate::config::TransportConfig;
use crate::directory::{PeerAddr, PeerDirectory};
use crate::error::TransportError;
use crate::frame;

/// Per-destination outcome of one send.
#[derive(Debug, Default)]
pub struct SendReport {
    /// Destinations that acknowledged the delivery.
    pub delivered: Vec<String>,
    /// Destinations that exhausted every attempt, with the final error.
    pub failed: Vec<(String, TransportError)>,
}

impl SendReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The message exchange primitive used by both node roles.
pub struct TcpTransport {
    config: TransportConfig,
    directory: Arc<RwLock<PeerDirectory>>,
    inbound: Option<mpsc::UnboundedReceiver<Envelope>>,
    shutdown: Option<watch::Sender<bool>>,
    local_addr: Option<SocketAddr>,
}

impl TcpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            directory: Arc::new(RwLock::new(PeerDirectory::new())),
            inbound: None,
            shutdown: None,
            local_addr: None,
        }
    }

    /// The address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.local_addr.ok_or(TransportError::NotStarted)
    }

    pub async fn register_peer(&self, id: impl Into<String>, addr: PeerAddr) {
        self.directory.write().await.add(id, addr);
    }

    pub async fn peer_count(&self) -> usize {
        self.directory.read().await.len()
    }

    pub async fn known_peer(&self, id: &str) -> bool {
        self.directory.read().await.contains(id)
    }

    /// Bind the listener and spawn the inbound accept loop.
    pub async fn start(&mut self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "transport listening");

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.inbound = Some(inbound_rx);
        self.shutdown = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        let config = self.config.clone();
        tokio::spawn(accept_loop(listener, inbound_tx, shutdown_rx, config));
        Ok(())
    }

    /// Stop the inbound listener. Envelopes already queued stay
    /// readable; once drained, `receive` reports the channel closed.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
    }

    /// Pop the oldest inbound envelope, waiting until one arrives.
    pub async fn receive(&mut self) -> Result<Envelope, TransportError> {
        let inbound = self.inbound.as_mut().ok_or(TransportError::NotStarted)?;
        inbound.recv().await.ok_or(TransportError::ChannelClosed)
    }

    /// Like [`receive`](Self::receive), but gives up after `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Result<Envelope, TransportError> {
        timeout(wait, self.receive())
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    /// Deliver an envelope to its destinations.
    ///
    /// A `Unicast` id missing from the directory fails the whole send
    /// with `UnknownPeer` before any network attempt. Per-destination
    /// delivery failures land in the report instead of an error so one
    /// unreachable peer does not mask the others.
    pub async fn send(&self, envelope: &Envelope) -> Result<SendReport, TransportError> {
        let targets = {
            let directory = self.directory.read().await;
            match &envelope.receiver {
                Receiver::Broadcast => directory.resolve_all(),
                Receiver::Unicast(ids) => ids
                    .iter()
                    .map(|id| directory.resolve(id).map(|addr| (id.clone(), addr)))
                    .collect::<Result<Vec<_>, _>>()?,
            }
        };

        let body = frame::encode_envelope(envelope, self.config.compression)?;
        let mut report = SendReport::default();
        for (id, addr) in targets {
            match self.send_to(&addr, &body).await {
                Ok(()) => report.delivered.push(id),
                Err(e) => {
                    tracing::warn!(peer = %id, addr = %addr, error = %e, "delivery failed");
                    report.failed.push((id, e));
                }
            }
        }
        Ok(report)
    }

    /// One destination: bounded attempts with doubling backoff.
    async fn send_to(&self, addr: &PeerAddr, body: &[u8]) -> Result<(), TransportError> {
        let attempts = self.config.max_retry_attempts.max(1);
        let mut delay = self.config.retry_base_delay();
        for attempt in 1..=attempts {
            match self.attempt_delivery(addr, body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(addr = %addr, attempt, error = %e, "delivery attempt failed");
                    if attempt < attempts {
                        sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }
        Err(TransportError::RetriesExhausted {
            peer: addr.to_string(),
            attempts,
        })
    }

    /// One connection: write the frame, require the ACK frame back.
    async fn attempt_delivery(&self, addr: &PeerAddr, body: &[u8]) -> Result<(), TransportError> {
        let mut stream = TcpStream::connect(addr.to_string()).await?;
        frame::write_frame(&mut stream, body, self.config.message_size_limit).await?;
        let reply = frame::read_frame(&mut stream, self.config.message_size_limit).await?;
        if reply != frame::ACK {
            return Err(TransportError::NoAck);
        }
        Ok(())
    }
}

/// Inbound accept loop: one task per connection, bounded by the
/// connection semaphore, all feeding the shared queue.
async fn accept_loop(
    listener: TcpListener,
    inbound: mpsc::UnboundedSender<Envelope>,
    mut shutdown: watch::Receiver<bool>,
    config: TransportConfig,
) {
    let semaphore = Arc::new(Semaphore::new(config.max_connections));
    loop {
        let accepted = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer_addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let inbound = inbound.clone();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_request(stream, &inbound, &config).await {
                tracing::warn!(peer = %peer_addr, error = %e, "inbound request error");
            }
            drop(permit);
        });
    }
    tracing::debug!("accept loop stopped");
}

/// One inbound request: read a frame, enqueue the envelope, reply ACK.
/// The ACK only acknowledges enqueueing; processing happens later.
async fn handle_request(
    mut stream: TcpStream,
    inbound: &mpsc::UnboundedSender<Envelope>,
    config: &TransportConfig,
) -> Result<(), TransportError> {
    let body = frame::read_frame(&mut stream, config.message_size_limit).await?;
    let envelope = frame::decode_envelope(&body, config.compression)?;
    tracing::trace!(
        message_type = %envelope.message_type,
        sender = %envelope.sender,
        round = envelope.communication_round,
        "envelope received"
    );
    inbound
        .send(envelope)
        .map_err(|_| TransportError::ChannelClosed)?;
    frame::write_frame(&mut stream, frame::ACK, config.message_size_limit).await?;
    Ok(())
}
