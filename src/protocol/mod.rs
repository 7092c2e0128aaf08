mod handshake;
mod mask;

pub use handshake::{Handshake, accept_key, write_handshake};
pub use mask::unmask;
