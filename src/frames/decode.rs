use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{Frame, Opcode};
use crate::{error::FrameError, protocol::unmask};

type Result<T> = std::result::Result<T, FrameError>;

// upfront allocation cap; longer payloads grow as bytes actually arrive
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Limits applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Largest accepted payload length. Defaults to `u64::MAX`.
    pub max_payload: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self { Self { max_payload: u64::MAX } }
}

// Accumulates the header fields of the frame being read; turned into a
// `Frame` only once the whole payload is in hand.
#[derive(Debug)]
struct DecodeContext {
    is_final: bool,
    opcode: Opcode,
    masked: bool,
    base_len: u8,
}

impl DecodeContext {
    fn from_header(b0: u8, b1: u8) -> Self {
        // 0   | 1 2 3 | 4 5 6 7
        // Fin | Rsv   | Opcode
        //
        // 0    | 1 2 3 4 5 6 7
        // Mask | Payload len
        Self {
            is_final: b0 & 0b1000_0000 != 0,
            opcode: Opcode::from(b0 & 0b0000_1111),
            masked: b1 & 0b1000_0000 != 0,
            base_len: b1 & 0b0111_1111,
        }
    }

    fn finish(self, payload: Vec<u8>) -> Frame {
        Frame {
            opcode: self.opcode,
            is_final: self.is_final,
            payload: Bytes::from(payload),
        }
    }
}

/// Read exactly one frame from `reader`.
///
/// Any short read aborts the decode with [`FrameError::Io`]; bytes already
/// consumed from the stream are lost and no partial frame is produced.
pub async fn read_frame<R>(reader: &mut R, config: &DecoderConfig) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let b0 = reader.read_u8().await?;
    let b1 = reader.read_u8().await?;
    let ctx = DecodeContext::from_header(b0, b1);

    let len = match ctx.base_len {
        126 => u64::from(reader.read_u16().await?),
        127 => reader.read_u64().await?,
        n => u64::from(n),
    };

    if len > config.max_payload {
        tracing::debug!(len, max = config.max_payload, "payload over limit");
        return Err(FrameError::TooLarge { len, max: config.max_payload });
    }
    let expected = usize::try_from(len).map_err(|_| FrameError::TooLarge {
        len,
        max: u64::try_from(usize::MAX).unwrap_or(u64::MAX),
    })?;

    let mask_key = if ctx.masked {
        let mut key = [0; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        tracing::debug!("unmasked frame");
        None
    };

    let mut payload = Vec::with_capacity(expected.min(INITIAL_PAYLOAD_CAPACITY));
    reader.take(len).read_to_end(&mut payload).await?;
    if payload.len() != expected {
        tracing::trace!(got = payload.len(), expected, "stream ended inside payload");
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    if let Some(key) = mask_key {
        unmask(&mut payload, key);
    }

    tracing::trace!(
        opcode = ?ctx.opcode,
        fin = ctx.is_final,
        masked = ctx.masked,
        payload_len = payload.len(),
        "frame decoded"
    );
    Ok(ctx.finish(payload))
}
