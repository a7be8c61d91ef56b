// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-framed JSON codec: 4-byte big-endian length prefix + UTF-8 JSON.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum single-message size (16 MiB), guarding against a misbehaving
/// peer sending a bogus length prefix.
pub const MAX_MESSAGE_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_BYTES}-byte limit")]
    TooLarge(u32),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed mid-message")]
    Truncated,
}

/// Read one length-framed JSON message, deserializing it as `T`.
pub async fn read_message<T, R>(reader: &mut R) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
    R: tokio::io::AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::Truncated)
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(len));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::Truncated
        } else {
            ProtocolError::Io(e)
        }
    })?;

    Ok(serde_json::from_slice(&payload)?)
}

/// Write one length-framed JSON message.
pub async fn write_message<T, W>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    T: Serialize,
    W: tokio::io::AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(value)?;
    let len: u32 =
        payload.len().try_into().map_err(|_| ProtocolError::TooLarge(u32::MAX))?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_a_message() {
        let msg = Message::Ping;
        let mut buf = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded: Message = read_message(&mut cursor).await.unwrap();
        assert_eq!(decoded, Message::Ping);
    }

    #[tokio::test]
    async fn truncated_stream_is_reported() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 10, 1, 2]);
        let result: Result<Message, _> = read_message(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::Truncated)));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let mut cursor = Cursor::new((MAX_MESSAGE_BYTES + 1).to_be_bytes().to_vec());
        let result: Result<Message, _> = read_message(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::TooLarge(_))));
    }
}
