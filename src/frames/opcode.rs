/// Frame opcode from the low nibble of the first header byte.
///
/// Values without a defined meaning are kept in [`Opcode::Reserved`] so the
/// caller decides what to do with them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Reserved(u8),
}

impl Opcode {
    /// Control opcodes have the high bit of the nibble set (0x8..=0xF).
    #[must_use]
    pub fn is_control(self) -> bool { u8::from(self) & 0b1000 != 0 }

    #[must_use]
    pub fn is_data(self) -> bool { matches!(self, Self::Continuation | Self::Text | Self::Binary) }
}

impl From<u8> for Opcode {
    fn from(b: u8) -> Self {
        match b & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Reserved(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::Close => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
            Opcode::Reserved(b) => b & 0x0F,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nibble_round_trips() {
        for b in 0..=0x0F_u8 {
            assert_eq!(u8::from(Opcode::from(b)), b);
        }
    }

    #[test]
    fn unknown_values_are_preserved() {
        assert_eq!(Opcode::from(0x3), Opcode::Reserved(0x3));
        assert_eq!(Opcode::from(0xB), Opcode::Reserved(0xB));
        // high nibble belongs to FIN/RSV and is ignored
        assert_eq!(Opcode::from(0xF1), Opcode::Text);
    }

    #[test]
    fn control_classification() {
        assert!(Opcode::Ping.is_control());
        assert!(Opcode::Reserved(0xC).is_control());
        assert!(!Opcode::Reserved(0x5).is_control());
        assert!(Opcode::Continuation.is_data());
        assert!(!Opcode::Close.is_data());
    }
}
