use std::io::Result;

use base64::engine::{Engine, general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::WS_GUID;

/// Outcome of [`write_handshake`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// The 101 response was written and flushed.
    Completed { accept: String },
    /// No usable `Sec-WebSocket-Key`; nothing was written.
    MissingKey,
}

impl Handshake {
    #[must_use]
    pub fn is_completed(&self) -> bool { matches!(self, Self::Completed { .. }) }
}

/// `base64(SHA-1(key ++ GUID))`, the full 28 character digest.
#[must_use]
pub fn accept_key(key: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(key.as_bytes());
    sha.update(WS_GUID.as_bytes());
    BASE64.encode(sha.finalize())
}

/// Write the `101 Switching Protocols` response for `key` and flush.
///
/// From here on the stream speaks WebSocket framing. A write or flush error
/// leaves the connection unusable.
pub async fn write_handshake<W>(writer: &mut W, key: Option<&str>) -> Result<Handshake>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
        tracing::debug!("no Sec-WebSocket-Key, skipping handshake");
        return Ok(Handshake::MissingKey);
    };

    let accept = accept_key(key);
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n",
    );

    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    tracing::trace!(accept = %accept, "handshake response sent");

    Ok(Handshake::Completed { accept })
}
