// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefix framing and envelope encoding.
//!
//! `encode`/`decode` handle the JSON envelope; `read_message`/`write_message`
//! add the 4-byte big-endian length prefix on the socket.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::{Message, MessageType};

/// Maximum frame size accepted from the peer (prevents memory exhaustion).
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Errors from framing, encoding, and payload extraction.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("message `{0}` carries no payload")]
    MissingPayload(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode an envelope to raw JSON bytes (no length prefix).
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode an envelope from raw JSON bytes.
pub fn decode(data: &[u8]) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_slice(data)?)
}

/// Encode `payload` into an envelope tagged `message_type` at `version`,
/// returning the raw JSON bytes ready for [`write_message`].
pub fn serialize_payload<T: Serialize>(
    message_type: MessageType,
    payload: &T,
    version: i32,
) -> Result<Vec<u8>, ProtocolError> {
    let message = Message {
        message_type,
        version,
        payload: Some(serde_json::to_value(payload)?),
    };
    encode(&message)
}

/// Decode an envelope's payload as `T`.
pub fn deserialize_payload<T: DeserializeOwned>(message: &Message) -> Result<T, ProtocolError> {
    let payload = message
        .payload
        .as_ref()
        .ok_or_else(|| ProtocolError::MissingPayload(message.message_type.as_tag().to_string()))?;
    Ok(serde_json::from_value(payload.clone())?)
}

/// Read one length-prefixed frame. Returns [`ProtocolError::ConnectionClosed`]
/// on clean EOF at a frame boundary.
pub async fn read_message<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(len));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

/// Write one length-prefixed frame.
pub async fn write_message<W>(writer: &mut W, data: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge(data.len()));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
