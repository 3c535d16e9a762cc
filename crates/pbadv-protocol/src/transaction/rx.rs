//! Receive transaction manager: ordering, deduplication and reassembly.
//!
//! The manager tracks one peer transaction at a time. Frames for that
//! transaction or its immediate successor are accepted; anything else is
//! dropped. Segments may arrive in any order and any number of times.
//!
//! Continuations that arrive before their Start are buffered in place and
//! checked against the declared length once the Start shows up.

use pbadv_core::TransactionId;
use pbadv_core::constants::{
    CONT_PAYLOAD_MAX, START_PAYLOAD_MAX, last_segment_index, segment_offset,
};

use super::segments::SegmentSet;
use crate::transport::FrameToken;

/// Structural violation in a peer transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    #[error("zero-length provisioning PDU")]
    ZeroLength,

    #[error("provisioning PDU of {len} bytes exceeds capacity {capacity}")]
    TooLarge { len: usize, capacity: usize },

    #[error("last segment {last_seg} does not match total length {len}")]
    SegmentCountMismatch { last_seg: u8, len: usize },

    #[error("segment index {index} beyond last segment {last_seg}")]
    SegmentIndex { index: u8, last_seg: u8 },

    #[error("segment {index} carries {actual} bytes, expected {expected}")]
    SegmentLength {
        index: u8,
        expected: usize,
        actual: usize,
    },
}

/// Result of feeding one segment to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Neither the tracked transaction nor its successor.
    Unexpected { expected: TransactionId },
    /// Segment of a transaction that already completed.
    Duplicate,
    /// Segment already stored for the transaction in progress.
    Redundant,
    /// Continuation ahead of its Start that cannot fit the reassembly
    /// buffer. Dropped without touching the tracked transaction.
    OutOfRange,
    /// Segment stored; more are missing. `began` marks the first segment of
    /// the peer's next transaction.
    Stored { began: bool },
    /// Every segment is present; the PDU awaits its FCS check.
    Complete { began: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Nothing received for the tracked id.
    Idle,
    /// The tracked transaction was thrown away; a retransmission restarts it.
    Discarded,
    AwaitingStart {
        buffered: SegmentSet,
        lens: [u8; SegmentSet::MAX_SEGMENTS],
    },
    Assembling {
        last_seg: u8,
        missing: SegmentSet,
    },
    Complete,
}

enum Admission {
    Drop(RxEvent),
    Current,
    Begin { began: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAck {
    xact_id: TransactionId,
    token: FrameToken,
}

#[derive(Debug)]
pub struct RxTransaction {
    id: TransactionId,
    state: RxState,
    buf: Vec<u8>,
    len: usize,
    fcs: u8,
    pending_ack: Option<PendingAck>,
}

/// Number of bytes segment `index` must carry in a PDU of `total` bytes.
pub fn expected_segment_len(index: u8, last_seg: u8, total: usize) -> usize {
    if index == last_seg {
        total - segment_offset(index as usize)
    } else if index == 0 {
        START_PAYLOAD_MAX
    } else {
        CONT_PAYLOAD_MAX
    }
}

impl RxTransaction {
    /// Allocate the reassembly buffer once; it is reused across links.
    pub fn new(capacity: usize, peer_initial: TransactionId) -> Self {
        Self {
            id: peer_initial,
            state: RxState::Idle,
            buf: vec![0; capacity],
            len: 0,
            fcs: 0,
            pending_ack: None,
        }
    }

    pub fn reset(&mut self, peer_initial: TransactionId) {
        self.id = peer_initial;
        self.state = RxState::Idle;
        self.len = 0;
        self.fcs = 0;
        self.pending_ack = None;
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Most recent peer transaction begun or completed.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn is_complete(&self) -> bool {
        self.state == RxState::Complete
    }

    pub fn is_assembling(&self) -> bool {
        matches!(
            self.state,
            RxState::AwaitingStart { .. } | RxState::Assembling { .. }
        )
    }

    /// Reassembled PDU; meaningful once complete.
    pub fn message(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn expected_fcs(&self) -> u8 {
        self.fcs
    }

    /// Throw away the tracked transaction so its retransmission is
    /// reassembled from scratch.
    pub fn discard(&mut self) {
        self.state = RxState::Discarded;
        self.len = 0;
    }

    pub fn pending_ack(&self) -> Option<TransactionId> {
        self.pending_ack.map(|pending| pending.xact_id)
    }

    pub fn set_pending_ack(&mut self, xact_id: TransactionId, token: FrameToken) {
        self.pending_ack = Some(PendingAck { xact_id, token });
    }

    /// Clear the pending ack if `token` is its frame.
    pub fn ack_sent(&mut self, token: FrameToken) -> bool {
        match self.pending_ack {
            Some(pending) if pending.token == token => {
                self.pending_ack = None;
                true
            }
            _ => false,
        }
    }

    fn admit(&self, xact_id: TransactionId) -> Admission {
        if xact_id == self.id {
            match self.state {
                RxState::Complete => Admission::Drop(RxEvent::Duplicate),
                RxState::Idle => Admission::Drop(RxEvent::Unexpected {
                    expected: self.id.next(),
                }),
                RxState::Discarded => Admission::Begin { began: false },
                RxState::AwaitingStart { .. } | RxState::Assembling { .. } => Admission::Current,
            }
        } else if xact_id == self.id.next() {
            Admission::Begin { began: true }
        } else {
            Admission::Drop(RxEvent::Unexpected {
                expected: self.id.next(),
            })
        }
    }

    fn begin(&mut self, xact_id: TransactionId) {
        self.id = xact_id;
        self.state = RxState::AwaitingStart {
            buffered: SegmentSet::empty(),
            lens: [0; SegmentSet::MAX_SEGMENTS],
        };
        self.len = 0;
    }

    /// Whether a continuation seen before any Start could belong to a PDU
    /// this buffer can hold.
    fn fits_unanchored(&self, index: u8, len: usize) -> bool {
        usize::from(index) < SegmentSet::MAX_SEGMENTS
            && segment_offset(usize::from(index)) + len <= self.capacity()
    }

    fn fail(&mut self, err: Malformed) -> Result<RxEvent, Malformed> {
        self.discard();
        Err(err)
    }

    /// Feed a Transaction Start segment.
    pub fn on_start(
        &mut self,
        xact_id: TransactionId,
        last_seg: u8,
        total_len: u16,
        fcs: u8,
        data: &[u8],
    ) -> Result<RxEvent, Malformed> {
        let began = match self.admit(xact_id) {
            Admission::Drop(event) => return Ok(event),
            Admission::Current => false,
            Admission::Begin { began } => {
                self.begin(xact_id);
                began
            }
        };

        let (buffered, lens) = match self.state {
            RxState::AwaitingStart { buffered, lens } => (buffered, lens),
            _ => return Ok(RxEvent::Redundant),
        };

        let len = usize::from(total_len);
        if len == 0 {
            return self.fail(Malformed::ZeroLength);
        }
        if len > self.capacity() {
            return self.fail(Malformed::TooLarge {
                len,
                capacity: self.capacity(),
            });
        }
        if usize::from(last_seg) != last_segment_index(len) {
            return self.fail(Malformed::SegmentCountMismatch { last_seg, len });
        }
        let expected = expected_segment_len(0, last_seg, len);
        if data.len() != expected {
            return self.fail(Malformed::SegmentLength {
                index: 0,
                expected,
                actual: data.len(),
            });
        }
        for index in buffered.iter() {
            if index > last_seg {
                return self.fail(Malformed::SegmentIndex { index, last_seg });
            }
            let expected = expected_segment_len(index, last_seg, len);
            let actual = usize::from(lens[usize::from(index)]);
            if actual != expected {
                return self.fail(Malformed::SegmentLength {
                    index,
                    expected,
                    actual,
                });
            }
        }

        self.buf[..data.len()].copy_from_slice(data);
        self.len = len;
        self.fcs = fcs;

        let mut missing = SegmentSet::up_to(last_seg);
        missing.mark_received(0);
        missing.remove_all(buffered);

        if missing.all_received() {
            self.state = RxState::Complete;
            Ok(RxEvent::Complete { began })
        } else {
            self.state = RxState::Assembling { last_seg, missing };
            Ok(RxEvent::Stored { began })
        }
    }

    /// Feed a Transaction Continuation segment (`index >= 1`).
    pub fn on_continuation(
        &mut self,
        xact_id: TransactionId,
        index: u8,
        data: &[u8],
    ) -> Result<RxEvent, Malformed> {
        let began = match self.admit(xact_id) {
            Admission::Drop(event) => return Ok(event),
            Admission::Current => false,
            Admission::Begin { began } => {
                if !self.fits_unanchored(index, data.len()) {
                    return Ok(RxEvent::OutOfRange);
                }
                self.begin(xact_id);
                began
            }
        };

        let offset = segment_offset(usize::from(index));
        match self.state {
            RxState::AwaitingStart {
                mut buffered,
                mut lens,
            } => {
                if buffered.contains(index) {
                    return Ok(RxEvent::Redundant);
                }
                if !self.fits_unanchored(index, data.len()) {
                    return Ok(RxEvent::OutOfRange);
                }
                self.buf[offset..offset + data.len()].copy_from_slice(data);
                buffered.insert(index);
                // data.len() <= CONT_PAYLOAD_MAX, enforced by the codec
                lens[usize::from(index)] = data.len() as u8;
                self.state = RxState::AwaitingStart { buffered, lens };
                Ok(RxEvent::Stored { began })
            }
            RxState::Assembling {
                last_seg,
                mut missing,
            } => {
                if index > last_seg {
                    return self.fail(Malformed::SegmentIndex { index, last_seg });
                }
                if !missing.contains(index) {
                    return Ok(RxEvent::Redundant);
                }
                let expected = expected_segment_len(index, last_seg, self.len);
                if data.len() != expected {
                    return self.fail(Malformed::SegmentLength {
                        index,
                        expected,
                        actual: data.len(),
                    });
                }
                self.buf[offset..offset + data.len()].copy_from_slice(data);
                missing.mark_received(index);
                if missing.all_received() {
                    self.state = RxState::Complete;
                    Ok(RxEvent::Complete { began })
                } else {
                    self.state = RxState::Assembling { last_seg, missing };
                    Ok(RxEvent::Stored { began })
                }
            }
            _ => Ok(RxEvent::Redundant),
        }
    }
}
