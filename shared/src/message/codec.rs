//! Wire codec for push-channel frames
//!
//! Frame layout, identical in both directions:
//!
//! ```text
//! [event_type: u8]
//! [request_id: 16 bytes]
//! [correlation_id: 16 bytes, nil uuid = none]
//! [payload_len: u32 LE]
//! [payload: payload_len bytes]
//! ```

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::{EventType, PushMessage};

/// Payloads above this size are rejected as corrupt frames
const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// Codec error
#[derive(Debug, Error)]
pub enum CodecError {
    /// Peer closed the connection
    #[error("Peer disconnected")]
    Disconnected,

    /// Malformed frame
    #[error("Invalid frame: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one frame from an async stream
pub async fn read_message<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<PushMessage, CodecError> {
    // Event type (1 byte); EOF here means a clean disconnect
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(CodecError::Disconnected);
        }
        Err(e) => return Err(CodecError::Io(e)),
    }

    let event_type = EventType::try_from(type_buf[0])
        .map_err(|_| CodecError::Invalid(format!("Unknown event type tag: {}", type_buf[0])))?;

    // Request ID (16 bytes)
    let mut uuid_buf = [0u8; 16];
    reader.read_exact(&mut uuid_buf).await.map_err(map_eof)?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // Correlation ID (16 bytes, nil = none)
    let mut correlation_buf = [0u8; 16];
    reader
        .read_exact(&mut correlation_buf)
        .await
        .map_err(map_eof)?;
    let correlation_id_raw = Uuid::from_bytes(correlation_buf);
    let correlation_id = (!correlation_id_raw.is_nil()).then_some(correlation_id_raw);

    // Payload length (4 bytes LE)
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(map_eof)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(CodecError::Invalid(format!("Payload too large: {}", len)));
    }

    // Payload
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(map_eof)?;

    Ok(PushMessage {
        request_id,
        event_type,
        correlation_id,
        payload,
    })
}

/// Write one frame to an async stream
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &PushMessage,
) -> Result<(), CodecError> {
    let mut data = Vec::with_capacity(1 + 16 + 16 + 4 + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());

    // Correlation id as nil uuid when absent
    let correlation_bytes = msg.correlation_id.unwrap_or(Uuid::nil()).into_bytes();
    data.extend_from_slice(&correlation_bytes);

    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer.write_all(&data).await?;
    Ok(())
}

// EOF mid-frame means the peer went away, not a framing bug
fn map_eof(e: std::io::Error) -> CodecError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        CodecError::Disconnected
    } else {
        CodecError::Io(e)
    }
}
