use fedround_network::frame::{decode_envelope, encode_envelope, read_frame, write_frame, ACK};
use fedround_network::{Compression, TransportError};
use fedround_protocol::{Envelope, MessageType, Receiver};

const LIMIT: usize = 1024 * 1024;

#[tokio::test]
async fn test_frame_roundtrip() {
    let mut wire = Vec::new();
    write_frame(&mut wire, b"hello", LIMIT).await.unwrap();
    let body = read_frame(&mut wire.as_slice(), LIMIT).await.unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn test_write_rejects_oversized_body() {
    let mut wire = Vec::new();
    let err = write_frame(&mut wire, &[0u8; 32], 16).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::FrameTooLarge { len: 32, limit: 16 }
    ));
    assert!(wire.is_empty());
}

#[tokio::test]
async fn test_read_rejects_oversized_body() {
    let mut wire = Vec::new();
    write_frame(&mut wire, &[0u8; 32], LIMIT).await.unwrap();
    let err = read_frame(&mut wire.as_slice(), 16).await.unwrap_err();
    assert!(matches!(err, TransportError::FrameTooLarge { .. }));
}

#[test]
fn test_envelope_body_roundtrip_per_compression() {
    let model = vec![7u8; 2048];
    let envelope = Envelope::payload("0", Receiver::Broadcast, &model, 4).unwrap();

    for compression in [Compression::None, Compression::Gzip, Compression::Deflate] {
        let body = encode_envelope(&envelope, compression).unwrap();
        let back = decode_envelope(&body, compression).unwrap();
        assert_eq!(back.message_type, MessageType::PAYLOAD);
        assert_eq!(back.sender, "0");
        assert_eq!(back.communication_round, 4);
        // The model seam resolves the blob on decode.
        assert_eq!(back.model_bytes().unwrap(), &model[..]);
    }
}

#[test]
fn test_compression_shrinks_repetitive_payloads() {
    let model = vec![0u8; 64 * 1024];
    let envelope = Envelope::payload("0", Receiver::Broadcast, &model, 0).unwrap();
    let plain = encode_envelope(&envelope, Compression::None).unwrap();
    let gzipped = encode_envelope(&envelope, Compression::Gzip).unwrap();
    assert!(gzipped.len() < plain.len());
}

#[test]
fn test_decode_garbage_fails_as_encoding_error() {
    let err = decode_envelope(b"not json", Compression::None).unwrap_err();
    assert!(matches!(err, TransportError::Encoding(_)));
}

#[test]
fn test_ack_literal() {
    assert_eq!(ACK, b"ACK");
}
