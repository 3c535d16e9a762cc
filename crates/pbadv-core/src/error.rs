//! Error types for the pbadv-core crate.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduError {
    TooShort { min: usize, actual: usize },
    PayloadTooLong { max: usize, actual: usize },
    UnknownOpcode(u8),
    InvalidCloseReason(u8),
    InvalidControlLength { opcode: u8, len: usize },
    SegmentIndexOutOfRange(u8),
    FrameOverflow,
}

impl fmt::Display for PduError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PduError::TooShort { min, actual } => {
                write!(f, "frame too short: need at least {min} bytes, got {actual}")
            }
            PduError::PayloadTooLong { max, actual } => {
                write!(f, "segment payload too long: max {max} bytes, got {actual}")
            }
            PduError::UnknownOpcode(v) => write!(f, "unknown bearer opcode: 0x{v:02x}"),
            PduError::InvalidCloseReason(v) => write!(f, "invalid close reason: 0x{v:02x}"),
            PduError::InvalidControlLength { opcode, len } => {
                write!(f, "invalid length {len} for bearer opcode 0x{opcode:02x}")
            }
            PduError::SegmentIndexOutOfRange(v) => write!(f, "segment index out of range: {v}"),
            PduError::FrameOverflow => write!(f, "encoded frame exceeds advertising capacity"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PduError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        let variants = [
            PduError::TooShort { min: 6, actual: 2 },
            PduError::PayloadTooLong { max: 23, actual: 30 },
            PduError::UnknownOpcode(0x3F),
            PduError::InvalidCloseReason(0x09),
            PduError::InvalidControlLength { opcode: 2, len: 0 },
            PduError::SegmentIndexOutOfRange(0),
            PduError::FrameOverflow,
        ];
        for variant in &variants {
            assert!(!variant.to_string().is_empty(), "{variant:?}");
        }
        assert_eq!(
            PduError::TooShort { min: 6, actual: 2 }.to_string(),
            "frame too short: need at least 6 bytes, got 2"
        );
        assert_eq!(
            PduError::UnknownOpcode(0x3F).to_string(),
            "unknown bearer opcode: 0x3f"
        );
    }
}
