use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};

use crate::{
    error::{FrameError, UpgradeError},
    frames::{DecoderConfig, Frame, read_frame},
    http::Headers,
    protocol::{Handshake, write_handshake},
};

/// Raw stream handed over by an HTTP layer, plus whatever it had already
/// buffered past the request head.
pub struct Hijacked<S> {
    pub stream: S,
    pub buffered: Bytes,
}

/// A hijack that did not happen. The host is handed back untouched so the
/// request can still be answered on the normal HTTP path.
pub struct HijackError<H> {
    pub host: H,
    pub error: UpgradeError,
}

impl<H> HijackError<H> {
    pub fn new(host: H, error: UpgradeError) -> Self { Self { host, error } }

    pub fn not_supported(host: H) -> Self { Self::new(host, UpgradeError::NotSupported) }
}

impl<H> std::fmt::Debug for HijackError<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HijackError").field("error", &self.error).finish_non_exhaustive()
    }
}

/// Capability of an HTTP layer to give up raw control of its socket.
///
/// Hosts that cannot do so return [`HijackError::not_supported`] with
/// themselves inside.
pub trait Hijack: Sized {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn hijack(self) -> Result<Hijacked<Self::Stream>, HijackError<Self>>;
}

/// Replays a prefix of already-buffered bytes before reading from `inner`.
/// Writes go straight to `inner`.
pub struct Prefixed<S> {
    prefix: Bytes,
    inner: S,
}

impl<S> Prefixed<S> {
    pub fn new(prefix: Bytes, inner: S) -> Self { Self { prefix, inner } }

    pub fn get_ref(&self) -> &S { &self.inner }
}

impl<S: AsyncRead + Unpin> AsyncRead for Prefixed<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.prefix.has_remaining() {
            let n = self.prefix.len().min(buf.remaining());
            buf.put_slice(&self.prefix[..n]);
            self.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Prefixed<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// One hijacked socket for the whole WebSocket session.
///
/// Holds a single buffered reader so bytes read ahead while decoding one
/// frame are available to the next. Dropping the connection closes the
/// socket.
pub struct Connection<S> {
    stream: BufReader<Prefixed<S>>,
    headers: Headers,
    decoder: DecoderConfig,
    read_timeout: Option<Duration>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Connection<S> {
    /// Take ownership of the socket behind `hijacker`.
    ///
    /// On failure nothing has been written and the host is returned.
    pub fn accept<H>(hijacker: H, headers: Headers) -> Result<Self, HijackError<H>>
    where
        H: Hijack<Stream = S>,
    {
        let Hijacked { stream, buffered } = hijacker.hijack()?;
        tracing::trace!(buffered = buffered.len(), "stream hijacked");
        Ok(Self {
            stream: BufReader::new(Prefixed::new(buffered, stream)),
            headers,
            decoder: DecoderConfig::default(),
            read_timeout: None,
        })
    }

    #[must_use]
    pub fn with_decoder_config(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    /// Deadline for each [`Connection::read_frame`] call.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn get_ref(&self) -> &S { self.stream.get_ref().get_ref() }

    /// Answer the upgrade using the request's `Sec-WebSocket-Key`.
    pub async fn handshake(&mut self) -> io::Result<Handshake> {
        let key = self.headers.get("Sec-WebSocket-Key");
        write_handshake(&mut self.stream, key).await
    }

    /// Decode the next frame. An expired read deadline is an
    /// [`io::ErrorKind::TimedOut`] I/O error.
    pub async fn read_frame(&mut self) -> Result<Frame, FrameError> {
        let fut = read_frame(&mut self.stream, &self.decoder);
        match self.read_timeout {
            Some(t) => tokio::time::timeout(t, fut).await.unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline elapsed").into())
            }),
            None => fut.await,
        }
    }

    /// Shut down the write half and drop the socket.
    pub async fn shutdown(mut self) -> io::Result<()> { self.stream.shutdown().await }
}
