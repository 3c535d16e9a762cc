//! Frame codec: advertising payload bytes <-> [`Pdu`].
//!
//! ```text
//! [link_id:4 BE][xact_id:1][gpc:1][body...]
//!
//! Start:        [total_len:2 BE][fcs:1][data <= 20]
//! Ack:          (empty)
//! Continuation: [data <= 23]
//! Control:      Open [uuid:16] | Ack () | Close [reason:1]
//! ```

use crate::constants::{
    ADV_PDU_MAX, CONT_PAYLOAD_MAX, LINK_ID_SIZE, PDU_HEADER_SIZE, START_MIN_SIZE,
    START_PAYLOAD_MAX,
};
use crate::error::PduError;
use crate::pdu::control::BearerControl;
use crate::pdu::gpc::Gpc;
use crate::types::{LinkId, TransactionId};

/// One encoded advertising frame.
pub type Frame = heapless::Vec<u8, ADV_PDU_MAX>;

/// Body of a Generic Provisioning PDU, borrowing segment data from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericProv<'a> {
    Start {
        last_seg: u8,
        total_len: u16,
        fcs: u8,
        data: &'a [u8],
    },
    Ack,
    Continuation {
        seg_index: u8,
        data: &'a [u8],
    },
    Control(BearerControl),
}

impl GenericProv<'_> {
    pub const fn gpc(&self) -> Gpc {
        match self {
            GenericProv::Start { last_seg, .. } => Gpc::Start {
                last_seg: *last_seg,
            },
            GenericProv::Ack => Gpc::Ack,
            GenericProv::Continuation { seg_index, .. } => Gpc::Continuation {
                seg_index: *seg_index,
            },
            GenericProv::Control(ctl) => Gpc::Control {
                opcode: ctl.opcode() as u8,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pdu<'a> {
    pub link_id: LinkId,
    pub xact_id: TransactionId,
    pub body: GenericProv<'a>,
}

impl<'a> Pdu<'a> {
    pub const fn new(link_id: LinkId, xact_id: TransactionId, body: GenericProv<'a>) -> Self {
        Self {
            link_id,
            xact_id,
            body,
        }
    }

    /// Decode one advertising payload.
    ///
    /// Trailing bytes after an Ack are ignored. Continuations with segment
    /// index 0 are rejected since index 0 is always the Start segment.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PduError> {
        if bytes.len() < PDU_HEADER_SIZE {
            return Err(PduError::TooShort {
                min: PDU_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let link_id = LinkId::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let xact_id = TransactionId::new(bytes[LINK_ID_SIZE]);
        let gpc = Gpc::from_byte(bytes[LINK_ID_SIZE + 1]);
        let rest = &bytes[PDU_HEADER_SIZE..];

        let body = match gpc {
            Gpc::Start { last_seg } => {
                if bytes.len() < START_MIN_SIZE {
                    return Err(PduError::TooShort {
                        min: START_MIN_SIZE,
                        actual: bytes.len(),
                    });
                }
                let data = &bytes[START_MIN_SIZE..];
                if data.len() > START_PAYLOAD_MAX {
                    return Err(PduError::PayloadTooLong {
                        max: START_PAYLOAD_MAX,
                        actual: data.len(),
                    });
                }
                GenericProv::Start {
                    last_seg,
                    total_len: u16::from_be_bytes([rest[0], rest[1]]),
                    fcs: rest[2],
                    data,
                }
            }
            Gpc::Ack => GenericProv::Ack,
            Gpc::Continuation { seg_index } => {
                if seg_index == 0 {
                    return Err(PduError::SegmentIndexOutOfRange(seg_index));
                }
                if rest.len() > CONT_PAYLOAD_MAX {
                    return Err(PduError::PayloadTooLong {
                        max: CONT_PAYLOAD_MAX,
                        actual: rest.len(),
                    });
                }
                GenericProv::Continuation {
                    seg_index,
                    data: rest,
                }
            }
            Gpc::Control { opcode } => GenericProv::Control(BearerControl::parse(opcode, rest)?),
        };

        Ok(Self {
            link_id,
            xact_id,
            body,
        })
    }

    /// Encode into a fixed-capacity frame.
    pub fn encode(&self) -> Result<Frame, PduError> {
        let mut frame = Frame::new();
        push(&mut frame, &self.link_id.to_be_bytes())?;
        push(&mut frame, &[self.xact_id.get(), self.body.gpc().to_byte()])?;

        match self.body {
            GenericProv::Start {
                last_seg: _,
                total_len,
                fcs,
                data,
            } => {
                if data.len() > START_PAYLOAD_MAX {
                    return Err(PduError::PayloadTooLong {
                        max: START_PAYLOAD_MAX,
                        actual: data.len(),
                    });
                }
                push(&mut frame, &total_len.to_be_bytes())?;
                push(&mut frame, &[fcs])?;
                push(&mut frame, data)?;
            }
            GenericProv::Ack => {}
            GenericProv::Continuation { seg_index, data } => {
                if seg_index == 0 {
                    return Err(PduError::SegmentIndexOutOfRange(seg_index));
                }
                if data.len() > CONT_PAYLOAD_MAX {
                    return Err(PduError::PayloadTooLong {
                        max: CONT_PAYLOAD_MAX,
                        actual: data.len(),
                    });
                }
                push(&mut frame, data)?;
            }
            GenericProv::Control(ctl) => match ctl {
                BearerControl::LinkOpen(uuid) => push(&mut frame, uuid.as_bytes())?,
                BearerControl::LinkAck => {}
                BearerControl::LinkClose(reason) => push(&mut frame, &[reason as u8])?,
            },
        }

        Ok(frame)
    }
}

fn push(frame: &mut Frame, bytes: &[u8]) -> Result<(), PduError> {
    frame
        .extend_from_slice(bytes)
        .map_err(|_| PduError::FrameOverflow)
}
