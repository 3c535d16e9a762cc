//! Protocol constants and enumerations for Generic Provisioning over advertising.

use crate::error::PduError;

// Frame layout
pub const LINK_ID_SIZE: usize = 4;
pub const PDU_HEADER_SIZE: usize = 6;
pub const START_HEADER_SIZE: usize = 3;
pub const START_MIN_SIZE: usize = PDU_HEADER_SIZE + START_HEADER_SIZE; // 9

// Segment payload capacities (advertising payload minus headers)
pub const START_PAYLOAD_MAX: usize = 20;
pub const CONT_PAYLOAD_MAX: usize = 23;

/// Largest encoded frame: a full Start segment.
pub const ADV_PDU_MAX: usize = START_MIN_SIZE + START_PAYLOAD_MAX; // 29

pub const DEVICE_UUID_SIZE: usize = 16;

/// Largest value of the 6-bit segment / opcode field in the GPC byte.
pub const GPC_FIELD_MAX: u8 = 0x3F;

// Transaction numbering
pub const XACT_ID_MAX: u8 = 0x7F;
pub const XACT_ID_NVAL: u8 = 0xFF;

/// Transaction id carried by every bearer-control frame.
pub const BEARER_CONTROL_XACT_ID: u8 = 0x00;

/// Generic Provisioning Control Format: the low two bits of the GPC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gpcf {
    TransactionStart = 0b00,
    TransactionAck = 0b01,
    TransactionContinuation = 0b10,
    BearerControl = 0b11,
}

impl Gpcf {
    /// Extract the format from a GPC byte. Every 2-bit value is defined.
    pub const fn from_gpc(byte: u8) -> Self {
        match byte & 0x03 {
            0b00 => Gpcf::TransactionStart,
            0b01 => Gpcf::TransactionAck,
            0b10 => Gpcf::TransactionContinuation,
            _ => Gpcf::BearerControl,
        }
    }

    /// Whether frames of this format are only meaningful on an open link.
    pub const fn requires_link(self) -> bool {
        !matches!(self, Gpcf::BearerControl)
    }
}

/// Bearer-control opcodes (upper six bits of a bearer-control GPC byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BearerOpcode {
    LinkOpen = 0x00,
    LinkAck = 0x01,
    LinkClose = 0x02,
}

impl BearerOpcode {
    pub fn from_u8(v: u8) -> Result<Self, PduError> {
        match v {
            0x00 => Ok(BearerOpcode::LinkOpen),
            0x01 => Ok(BearerOpcode::LinkAck),
            0x02 => Ok(BearerOpcode::LinkClose),
            _ => Err(PduError::UnknownOpcode(v)),
        }
    }
}

/// Reason carried by a Link Close message and reported when a link ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CloseReason {
    Success = 0x00,
    Timeout = 0x01,
    Fail = 0x02,
}

impl CloseReason {
    pub fn from_u8(v: u8) -> Result<Self, PduError> {
        match v {
            0x00 => Ok(CloseReason::Success),
            0x01 => Ok(CloseReason::Timeout),
            0x02 => Ok(CloseReason::Fail),
            _ => Err(PduError::InvalidCloseReason(v)),
        }
    }
}

impl core::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CloseReason::Success => write!(f, "success"),
            CloseReason::Timeout => write!(f, "timeout"),
            CloseReason::Fail => write!(f, "fail"),
        }
    }
}

/// Index of the final segment for a PDU of `len` bytes.
pub const fn last_segment_index(len: usize) -> usize {
    if len <= START_PAYLOAD_MAX {
        0
    } else {
        1 + (len - START_PAYLOAD_MAX - 1) / CONT_PAYLOAD_MAX
    }
}

/// Number of frames needed to carry a PDU of `len` bytes.
pub const fn segment_count(len: usize) -> usize {
    last_segment_index(len) + 1
}

/// Byte offset of segment `index` inside the reassembled PDU.
pub const fn segment_offset(index: usize) -> usize {
    if index == 0 {
        0
    } else {
        START_PAYLOAD_MAX + (index - 1) * CONT_PAYLOAD_MAX
    }
}

/// Largest PDU that fits in `segments` frames.
pub const fn max_pdu_len(segments: usize) -> usize {
    if segments == 0 {
        0
    } else {
        segment_offset(segments - 1) + if segments == 1 {
            START_PAYLOAD_MAX
        } else {
            CONT_PAYLOAD_MAX
        }
    }
}
