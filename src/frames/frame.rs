use bytes::Bytes;

use super::Opcode;

/// A single frame as read off the wire, already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub(crate) opcode: Opcode,
    pub(crate) is_final: bool,
    pub(crate) payload: Bytes,
}

impl Frame {
    #[must_use]
    pub fn opcode(&self) -> Opcode { self.opcode }

    /// True when FIN is set, i.e. this is the last (or only) fragment.
    #[must_use]
    pub fn is_final(&self) -> bool { self.is_final }

    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Payload as UTF-8 if this is a text frame with valid contents.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        if self.opcode != Opcode::Text {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }
}
