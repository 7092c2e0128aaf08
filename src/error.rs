use std::io;

use thiserror::Error;

/// Errors raised before the raw stream is committed to WebSocket framing.
///
/// None of these are written to the raw connection; the HTTP layer answers
/// them with a plain error response.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The hosting HTTP layer cannot hand over the raw socket.
    #[error("websocket not supported")]
    NotSupported,
    /// Failed to read the request head.
    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),
    /// Failed to write an HTTP error response.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
    /// Request line or a header line could not be parsed.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// The request head exceeded the size limit.
    #[error("request head too large")]
    HeadTooLarge,
    /// No WebSocket endpoint at the requested path.
    #[error("no websocket endpoint at {0}")]
    NotFound(String),
    /// The request is not a valid upgrade request.
    #[error("bad upgrade request: {0}")]
    BadRequest(&'static str),
}

impl UpgradeError {
    /// Status line used when rejecting the request on the HTTP path.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "404 Not Found",
            Self::HeadTooLarge => "431 Request Header Fields Too Large",
            _ => "400 Bad Request",
        }
    }
}

/// Errors from decoding a single frame. No partial frame is ever returned.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Short read, closed stream, deadline expiry or any other stream error.
    #[error("i/o error while reading frame: {0}")]
    Io(#[from] io::Error),
    /// Declared payload length exceeds the configured limit or `usize`.
    #[error("frame payload of {len} bytes exceeds limit of {max}")]
    TooLarge { len: u64, max: u64 },
}

impl FrameError {
    /// True when the peer closed the stream (possibly mid-frame).
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
