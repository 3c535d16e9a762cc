//! The Generic Provisioning Control byte.
//!
//! Bits 1..0 select the format ([`Gpcf`]); bits 7..2 carry the last segment
//! index, the continuation segment index, or the bearer opcode.

use crate::constants::{GPC_FIELD_MAX, Gpcf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gpc {
    Start { last_seg: u8 },
    Ack,
    Continuation { seg_index: u8 },
    Control { opcode: u8 },
}

impl Gpc {
    pub const fn from_byte(byte: u8) -> Self {
        let field = byte >> 2;
        match Gpcf::from_gpc(byte) {
            Gpcf::TransactionStart => Gpc::Start { last_seg: field },
            Gpcf::TransactionAck => Gpc::Ack,
            Gpcf::TransactionContinuation => Gpc::Continuation { seg_index: field },
            Gpcf::BearerControl => Gpc::Control { opcode: field },
        }
    }

    /// Encode to a GPC byte. Field values above 6 bits are truncated.
    pub const fn to_byte(self) -> u8 {
        let (field, format) = match self {
            Gpc::Start { last_seg } => (last_seg, Gpcf::TransactionStart),
            Gpc::Ack => (0, Gpcf::TransactionAck),
            Gpc::Continuation { seg_index } => (seg_index, Gpcf::TransactionContinuation),
            Gpc::Control { opcode } => (opcode, Gpcf::BearerControl),
        };
        ((field & GPC_FIELD_MAX) << 2) | format as u8
    }

    pub const fn format(self) -> Gpcf {
        match self {
            Gpc::Start { .. } => Gpcf::TransactionStart,
            Gpc::Ack => Gpcf::TransactionAck,
            Gpc::Continuation { .. } => Gpcf::TransactionContinuation,
            Gpc::Control { .. } => Gpcf::BearerControl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bytes() {
        assert_eq!(Gpc::from_byte(0x00), Gpc::Start { last_seg: 0 });
        assert_eq!(Gpc::from_byte(0x10), Gpc::Start { last_seg: 4 });
        assert_eq!(Gpc::from_byte(0x01), Gpc::Ack);
        assert_eq!(Gpc::from_byte(0x06), Gpc::Continuation { seg_index: 1 });
        assert_eq!(Gpc::from_byte(0x03), Gpc::Control { opcode: 0 });
        assert_eq!(Gpc::from_byte(0x0B), Gpc::Control { opcode: 2 });
    }

    #[test]
    fn encode_known() {
        assert_eq!(Gpc::Start { last_seg: 2 }.to_byte(), 0x08);
        assert_eq!(Gpc::Ack.to_byte(), 0x01);
        assert_eq!(Gpc::Continuation { seg_index: 3 }.to_byte(), 0x0E);
        assert_eq!(Gpc::Control { opcode: 1 }.to_byte(), 0x07);
    }

    #[test]
    fn format_matches_low_bits() {
        for byte in 0..=u8::MAX {
            let gpc = Gpc::from_byte(byte);
            assert_eq!(gpc.format(), Gpcf::from_gpc(byte));
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn byte_roundtrip_except_ack_field(byte: u8) {
                let gpc = Gpc::from_byte(byte);
                if gpc == Gpc::Ack {
                    prop_assert_eq!(gpc.to_byte(), 0x01);
                } else {
                    prop_assert_eq!(gpc.to_byte(), byte);
                }
            }
        }
    }
}
