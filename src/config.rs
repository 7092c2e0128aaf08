use std::time::Duration;

use crate::frames::DecoderConfig;

/// Settings for [`WebSocketServer`](crate::WebSocketServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`.
    pub addr: String,
    /// Only upgrade requests for this path are accepted.
    pub path: String,
    /// Largest accepted frame payload.
    pub max_payload: u64,
    /// Deadline for each frame read; `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".into(),
            path: "/".into(),
            max_payload: u64::MAX,
            read_timeout: None,
        }
    }
}

impl ServerConfig {
    pub(crate) fn decoder(&self) -> DecoderConfig {
        DecoderConfig {
            max_payload: self.max_payload,
        }
    }
}
