use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::Instrument;

use crate::{
    config::ServerConfig,
    conn::{Connection, Hijack, HijackError, Hijacked},
    error::{FrameError, UpgradeError},
    frames::Frame,
    http::RequestHead,
};

/// Receives every frame read from an upgraded connection.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    async fn on_frame(&self, peer: SocketAddr, frame: Frame);

    /// Called once with the error that ended the read loop.
    async fn on_error(&self, _peer: SocketAddr, _err: &FrameError) {}
}

/// Logs each frame at `info`.
pub struct LogHandler;

#[async_trait]
impl FrameHandler for LogHandler {
    async fn on_frame(&self, peer: SocketAddr, frame: Frame) {
        tracing::info!(
            %peer,
            opcode = ?frame.opcode(),
            fin = frame.is_final(),
            len = frame.payload().len(),
            text = frame.text(),
            "frame received"
        );
    }
}

/// An HTTP connection whose request head has been read but not answered.
pub struct RawHttpConn<S> {
    reader: BufReader<S>,
    head: RequestHead,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> RawHttpConn<S> {
    pub async fn read(stream: S) -> Result<Self, UpgradeError> {
        let mut reader = BufReader::new(stream);
        let head = RequestHead::read(&mut reader).await?;
        Ok(Self { reader, head })
    }

    /// Like [`RawHttpConn::read`], giving up with a `TimedOut` read error
    /// once `timeout` elapses.
    pub async fn read_with_timeout(
        stream: S,
        timeout: Option<Duration>,
    ) -> Result<Self, UpgradeError> {
        let Some(t) = timeout else {
            return Self::read(stream).await;
        };
        tokio::time::timeout(t, Self::read(stream))
            .await
            .unwrap_or_else(|_| {
                Err(UpgradeError::Read(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "request head deadline elapsed",
                )))
            })
    }

    pub fn head(&self) -> &RequestHead { &self.head }

    /// Check that this is a WebSocket upgrade request for `path`.
    pub fn validate(&self, path: &str) -> Result<(), UpgradeError> {
        let head = &self.head;
        if head.route() != path {
            return Err(UpgradeError::NotFound(head.route().to_string()));
        }
        if head.method != "GET" {
            return Err(UpgradeError::BadRequest("method must be GET"));
        }
        if !head.headers.has_token("Upgrade", "websocket") {
            return Err(UpgradeError::BadRequest("missing Upgrade: websocket"));
        }
        if !head.headers.has_token("Connection", "upgrade") {
            return Err(UpgradeError::BadRequest("missing Connection: Upgrade"));
        }
        if head.headers.get("Sec-WebSocket-Key").is_none_or(str::is_empty) {
            return Err(UpgradeError::BadRequest("missing Sec-WebSocket-Key"));
        }
        Ok(())
    }

    /// Answer on the normal HTTP path and drop the connection.
    pub async fn reject(mut self, err: &UpgradeError) -> Result<(), UpgradeError> {
        let body = format!("{err}\n");
        let response = format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            err.status(),
            body.len(),
        );
        let stream = self.reader.get_mut();
        stream
            .write_all(response.as_bytes())
            .await
            .map_err(UpgradeError::Write)?;
        stream.shutdown().await.map_err(UpgradeError::Write)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Hijack for RawHttpConn<S> {
    type Stream = S;

    fn hijack(self) -> Result<Hijacked<S>, HijackError<Self>> {
        let buffered = Bytes::copy_from_slice(self.reader.buffer());
        Ok(Hijacked {
            stream: self.reader.into_inner(),
            buffered,
        })
    }
}

pub struct WebSocketServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl WebSocketServer {
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.addr.as_str()).await?;
        tracing::info!(addr = %listener.local_addr()?, path = %config.path, "listening");
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Accept connections forever, one task per connection.
    pub async fn run<H: FrameHandler>(self, handler: H) {
        let handler = Arc::new(handler);
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(x) => x,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let config = Arc::clone(&self.config);
            let handler = Arc::clone(&handler);
            let span = tracing::info_span!("conn", %peer);
            tokio::spawn(serve(stream, peer, config, handler).instrument(span));
        }
    }
}

async fn serve<H: FrameHandler>(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    handler: Arc<H>,
) {
    let raw = match RawHttpConn::read_with_timeout(stream, config.read_timeout).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable request");
            return;
        }
    };

    if let Err(e) = raw.validate(&config.path) {
        tracing::debug!(error = %e, "rejecting request");
        if let Err(e) = raw.reject(&e).await {
            tracing::debug!(error = %e, "failed to send rejection");
        }
        return;
    }

    let headers = raw.head().headers.clone();
    let mut conn = match Connection::accept(raw, headers) {
        Ok(conn) => conn
            .with_decoder_config(config.decoder())
            .with_read_timeout(config.read_timeout),
        Err(HijackError { host, error }) => {
            tracing::warn!(error = %error, "hijack failed");
            if let Err(e) = host.reject(&error).await {
                tracing::debug!(error = %e, "failed to send rejection");
            }
            return;
        }
    };

    match conn.handshake().await {
        Ok(h) if h.is_completed() => tracing::info!("client connected"),
        Ok(_) => {
            tracing::warn!("handshake not completed");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "handshake failed");
            return;
        }
    }

    loop {
        match conn.read_frame().await {
            Ok(frame) => handler.on_frame(peer, frame).await,
            Err(e) => {
                if e.is_eof() {
                    tracing::info!("client disconnected");
                } else {
                    tracing::warn!(error = %e, "error reading frame");
                }
                handler.on_error(peer, &e).await;
                break;
            }
        }
    }

    if let Err(e) = conn.shutdown().await {
        tracing::debug!(error = %e, "shutdown failed");
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};

    use super::*;

    async fn raw_conn(request: &[u8]) -> (RawHttpConn<DuplexStream>, DuplexStream) {
        let (ours, mut peer) = duplex(4096);
        peer.write_all(request).await.unwrap();
        (RawHttpConn::read(ours).await.unwrap(), peer)
    }

    const UPGRADE: &[u8] = b"GET /ws HTTP/1.1\r\n\
        Host: localhost\r\n\
        Upgrade: WebSocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    #[tokio::test]
    async fn accepts_upgrade() {
        let (conn, _peer) = raw_conn(UPGRADE).await;
        assert!(conn.validate("/ws").is_ok());
    }

    #[tokio::test]
    async fn wrong_path_is_not_found() {
        let (conn, _peer) = raw_conn(UPGRADE).await;
        let err = conn.validate("/").unwrap_err();
        assert!(matches!(err, UpgradeError::NotFound(ref p) if p == "/ws"));
        assert_eq!(err.status(), "404 Not Found");
    }

    #[tokio::test]
    async fn plain_get_is_bad_request() {
        let (conn, _peer) = raw_conn(b"GET /ws HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(matches!(
            conn.validate("/ws"),
            Err(UpgradeError::BadRequest("missing Upgrade: websocket"))
        ));
    }

    #[tokio::test]
    async fn missing_key_is_bad_request() {
        let (conn, _peer) = raw_conn(
            b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: upgrade\r\n\r\n",
        )
        .await;
        assert!(matches!(
            conn.validate("/"),
            Err(UpgradeError::BadRequest("missing Sec-WebSocket-Key"))
        ));
    }

    #[tokio::test]
    async fn reject_writes_http_error() {
        let (ours, mut peer) = duplex(4096);
        peer.write_all(b"POST / HTTP/1.1\r\n\r\n").await.unwrap();
        let conn = RawHttpConn::read(ours).await.unwrap();
        let err = conn.validate("/").unwrap_err();
        conn.reject(&err).await.unwrap();

        let mut response = String::new();
        peer.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.ends_with("bad upgrade request: method must be GET\n"));
    }

    #[tokio::test]
    async fn slow_request_head_times_out() {
        let (ours, _peer) = duplex(64);
        match RawHttpConn::read_with_timeout(ours, Some(Duration::from_millis(20))).await {
            Err(UpgradeError::Read(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            Err(e) => panic!("expected timeout, got {e:?}"),
            Ok(_) => panic!("expected timeout, got a request"),
        }
    }

    struct Unhijackable(RawHttpConn<DuplexStream>);

    impl Hijack for Unhijackable {
        type Stream = DuplexStream;

        fn hijack(self) -> Result<Hijacked<DuplexStream>, HijackError<Self>> {
            Err(HijackError::not_supported(self))
        }
    }

    #[tokio::test]
    async fn failed_hijack_is_answered_over_http() {
        let (ours, mut peer) = duplex(4096);
        peer.write_all(UPGRADE).await.unwrap();
        let raw = RawHttpConn::read(ours).await.unwrap();
        let headers = raw.head().headers.clone();

        let HijackError { host, error } = Connection::accept(Unhijackable(raw), headers)
            .err()
            .unwrap();
        host.0.reject(&error).await.unwrap();

        let mut response = String::new();
        peer.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.ends_with("websocket not supported\n"));
    }

    #[tokio::test]
    async fn hijack_keeps_read_ahead() {
        let (ours, mut peer) = duplex(4096);
        let mut req = UPGRADE.to_vec();
        req.extend_from_slice(b"\x81\x00");
        peer.write_all(&req).await.unwrap();

        let conn = RawHttpConn::read(ours).await.unwrap();
        let Hijacked { buffered, .. } = conn.hijack().unwrap();
        assert_eq!(buffered.as_ref(), b"\x81\x00");
    }
}
