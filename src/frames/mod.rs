mod decode;
mod frame;
mod opcode;

pub use decode::{DecoderConfig, read_frame};
pub use frame::Frame;
pub use opcode::Opcode;
