#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod config;
mod conn;
mod error;
mod frames;
mod http;
mod protocol;
mod server;

pub use config::ServerConfig;
pub use conn::{Connection, Hijack, HijackError, Hijacked, Prefixed};
pub use error::{FrameError, UpgradeError};
pub use frames::{DecoderConfig, Frame, Opcode, read_frame};
pub use http::{Headers, RequestHead};
pub use protocol::{Handshake, accept_key, unmask, write_handshake};
pub use server::{FrameHandler, LogHandler, RawHttpConn, WebSocketServer};

/// GUID appended to the client key before hashing, see
/// [RFC 6455 §1.3](https://www.rfc-editor.org/rfc/rfc6455.html#section-1.3).
pub(crate) const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
/// Upper bound on an HTTP request head read before hijacking.
pub(crate) const MAX_REQUEST_HEAD: usize = 8 * 1024;
