use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use fedround_network::{Compression, PeerAddr, TcpTransport, TransportConfig, TransportError};
use fedround_protocol::{Envelope, MessageType, Receiver};

fn test_config() -> TransportConfig {
    TransportConfig {
        bind_address: "127.0.0.1:0".to_string(),
        max_retry_attempts: 2,
        retry_base_delay_ms: 20,
        ..TransportConfig::default()
    }
}

async fn started(config: TransportConfig) -> TcpTransport {
    let mut transport = TcpTransport::new(config);
    transport.start().await.unwrap();
    transport
}

fn peer_addr_of(transport: &TcpTransport) -> PeerAddr {
    let addr = transport.local_addr().unwrap();
    PeerAddr::new(addr.ip().to_string(), addr.port())
}

/// A free localhost port, reserved briefly by binding then dropping.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_send_and_receive() {
    let sender = started(test_config()).await;
    let mut receiver = started(test_config()).await;
    sender.register_peer("1", peer_addr_of(&receiver)).await;

    let model = vec![42u8; 256];
    let envelope = Envelope::payload("0", Receiver::unicast("1"), &model, 3).unwrap();
    let report = sender.send(&envelope).await.unwrap();
    assert_eq!(report.delivered, vec!["1".to_string()]);
    assert!(report.all_delivered());

    let got = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
    assert_eq!(got.message_type, MessageType::PAYLOAD);
    assert_eq!(got.sender, "0");
    assert_eq!(got.communication_round, 3);
    assert_eq!(got.model_bytes().unwrap(), &model[..]);
}

#[tokio::test]
async fn test_receive_preserves_fifo_order() {
    let sender = started(test_config()).await;
    let mut receiver = started(test_config()).await;
    sender.register_peer("1", peer_addr_of(&receiver)).await;

    for round in 0..4 {
        let envelope = Envelope::payload("0", Receiver::unicast("1"), b"m", round).unwrap();
        sender.send(&envelope).await.unwrap();
    }
    for round in 0..4 {
        let got = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(got.communication_round, round);
    }
}

#[tokio::test]
async fn test_broadcast_reaches_every_peer() {
    let sender = started(test_config()).await;
    let mut worker_a = started(test_config()).await;
    let mut worker_b = started(test_config()).await;
    sender.register_peer("1", peer_addr_of(&worker_a)).await;
    sender.register_peer("2", peer_addr_of(&worker_b)).await;

    let envelope = Envelope::payload("0", Receiver::Broadcast, b"model", 0).unwrap();
    let report = sender.send(&envelope).await.unwrap();
    assert_eq!(report.delivered.len(), 2);

    for worker in [&mut worker_a, &mut worker_b] {
        let got = worker.recv_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(got.message_type, MessageType::PAYLOAD);
    }
}

#[tokio::test]
async fn test_unknown_unicast_destination_fails_fast() {
    let sender = started(test_config()).await;
    let envelope = Envelope::payload("0", Receiver::unicast("99"), b"m", 0).unwrap();
    let start = Instant::now();
    let err = sender.send(&envelope).await.unwrap_err();
    assert!(matches!(err, TransportError::UnknownPeer(id) if id == "99"));
    // Fails on directory lookup, before any connect/retry cycle.
    assert!(start.elapsed() < Duration::from_millis(20));
}

#[tokio::test]
async fn test_send_retries_until_listener_appears() {
    let config = TransportConfig {
        max_retry_attempts: 5,
        retry_base_delay_ms: 100,
        ..test_config()
    };
    let sender = started(config.clone()).await;
    let port = free_port().await;
    sender.register_peer("1", PeerAddr::new("127.0.0.1", port)).await;

    // The destination only starts listening after the first attempt has
    // already failed, forcing at least one backoff sleep.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut prefix = [0u8; 4];
            stream.read_exact(&mut prefix).await.unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(prefix) as usize];
            stream.read_exact(&mut body).await.unwrap();
            stream.write_all(&3u32.to_be_bytes()).await.unwrap();
            stream.write_all(b"ACK").await.unwrap();
        }
    });

    let envelope = Envelope::payload("0", Receiver::unicast("1"), b"m", 0).unwrap();
    let start = Instant::now();
    let report = sender.send(&envelope).await.unwrap();
    assert!(report.all_delivered());
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_retry_exhaustion_is_surfaced() {
    let config = TransportConfig {
        max_retry_attempts: 3,
        retry_base_delay_ms: 10,
        ..test_config()
    };
    let sender = started(config).await;
    let port = free_port().await;
    sender.register_peer("1", PeerAddr::new("127.0.0.1", port)).await;

    let envelope = Envelope::payload("0", Receiver::unicast("1"), b"m", 0).unwrap();
    let start = Instant::now();
    let report = sender.send(&envelope).await.unwrap();
    assert!(report.delivered.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].1,
        TransportError::RetriesExhausted { attempts: 3, .. }
    ));
    // Two backoff sleeps: base * 2^0 + base * 2^1.
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_recv_timeout_expires() {
    let mut transport = started(test_config()).await;
    let err = transport
        .recv_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Timeout));
}

#[tokio::test]
async fn test_receive_before_start_fails() {
    let mut transport = TcpTransport::new(test_config());
    let err = transport.receive().await.unwrap_err();
    assert!(matches!(err, TransportError::NotStarted));
}

#[tokio::test]
async fn test_compressed_channel_end_to_end() {
    let config = TransportConfig {
        compression: Compression::Gzip,
        ..test_config()
    };
    let sender = started(config.clone()).await;
    let mut receiver = started(config).await;
    sender.register_peer("1", peer_addr_of(&receiver)).await;

    let model = vec![9u8; 4096];
    let envelope = Envelope::payload("0", Receiver::unicast("1"), &model, 1).unwrap();
    sender.send(&envelope).await.unwrap();

    let got = receiver.recv_timeout(Duration::from_secs(5)).await.unwrap();
    assert_eq!(got.model_bytes().unwrap(), &model[..]);
}

#[tokio::test]
async fn test_stop_halts_new_deliveries() {
    let sender = started(test_config()).await;
    let mut receiver = started(test_config()).await;
    sender.register_peer("1", peer_addr_of(&receiver)).await;
    receiver.stop();
    // Give the accept loop a moment to wind down.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let envelope = Envelope::payload("0", Receiver::unicast("1"), b"m", 0).unwrap();
    let report = sender.send(&envelope).await.unwrap();
    assert!(!report.all_delivered());
}
