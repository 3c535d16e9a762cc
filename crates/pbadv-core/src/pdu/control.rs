//! Bearer-control messages used to open, acknowledge and close a link.

use crate::constants::{BearerOpcode, CloseReason, DEVICE_UUID_SIZE};
use crate::error::PduError;
use crate::types::DeviceUuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerControl {
    LinkOpen(DeviceUuid),
    LinkAck,
    LinkClose(CloseReason),
}

impl BearerControl {
    /// Parse the body of a bearer-control frame.
    ///
    /// Payload sizes must match the opcode exactly: 16 bytes for Link Open,
    /// none for Link Ack, one reason byte for Link Close.
    pub fn parse(opcode: u8, payload: &[u8]) -> Result<Self, PduError> {
        let op = BearerOpcode::from_u8(opcode)?;
        let expected = Self::payload_len(op);
        if payload.len() != expected {
            return Err(PduError::InvalidControlLength {
                opcode,
                len: payload.len(),
            });
        }
        match op {
            BearerOpcode::LinkOpen => {
                let uuid = DeviceUuid::try_from(payload).map_err(|_| {
                    PduError::InvalidControlLength {
                        opcode,
                        len: payload.len(),
                    }
                })?;
                Ok(BearerControl::LinkOpen(uuid))
            }
            BearerOpcode::LinkAck => Ok(BearerControl::LinkAck),
            BearerOpcode::LinkClose => Ok(BearerControl::LinkClose(CloseReason::from_u8(
                payload[0],
            )?)),
        }
    }

    pub const fn opcode(&self) -> BearerOpcode {
        match self {
            BearerControl::LinkOpen(_) => BearerOpcode::LinkOpen,
            BearerControl::LinkAck => BearerOpcode::LinkAck,
            BearerControl::LinkClose(_) => BearerOpcode::LinkClose,
        }
    }

    pub const fn payload_len(op: BearerOpcode) -> usize {
        match op {
            BearerOpcode::LinkOpen => DEVICE_UUID_SIZE,
            BearerOpcode::LinkAck => 0,
            BearerOpcode::LinkClose => 1,
        }
    }
}
