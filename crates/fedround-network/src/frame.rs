//! Wire framing: 4-byte big-endian length prefix plus body.
//!
//! The body of an envelope frame is its JSON run through the configured
//! compression. The acknowledgement frame body is the literal `ACK`,
//! never compressed. The message size limit applies to the body length
//! in both directions.

use std::io::{Read, Write};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use fedround_protocol::{decode_payload, Envelope};

use crate::config::Compression;
use crate::error::TransportError;

/// Body of the acknowledgement frame every delivery expects back.
pub const ACK: &[u8] = b"ACK";

const LEN_PREFIX_SIZE: usize = 4;

/// Write one frame: length prefix, then body.
pub async fn write_frame<W>(writer: &mut W, body: &[u8], limit: usize) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > limit {
        return Err(TransportError::FrameTooLarge {
            len: body.len(),
            limit,
        });
    }
    let prefix = (body.len() as u32).to_be_bytes();
    writer.write_all(&prefix).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame body, rejecting oversized frames before allocating.
pub async fn read_frame<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > limit {
        return Err(TransportError::FrameTooLarge { len, limit });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Encode an envelope into a frame body: JSON, then compression.
pub fn encode_envelope(
    envelope: &Envelope,
    compression: Compression,
) -> Result<Vec<u8>, TransportError> {
    let json = serde_json::to_vec(envelope).map_err(fedround_protocol::EncodingError::from)?;
    Ok(compress(&json, compression)?)
}

/// Decode a frame body back into an envelope, resolving the model seam.
pub fn decode_envelope(
    body: &[u8],
    compression: Compression,
) -> Result<Envelope, TransportError> {
    let json = decompress(body, compression)?;
    let mut envelope: Envelope =
        serde_json::from_slice(&json).map_err(fedround_protocol::EncodingError::from)?;
    envelope.content = decode_payload(envelope.content)?;
    Ok(envelope)
}

fn compress(data: &[u8], compression: Compression) -> std::io::Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        Compression::Deflate => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}

fn decompress(data: &[u8], compression: Compression) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    match compression {
        Compression::None => out.extend_from_slice(data),
        Compression::Gzip => {
            flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
        }
        Compression::Deflate => {
            flate2::read::DeflateDecoder::new(data).read_to_end(&mut out)?;
        }
    }
    Ok(out)
}
