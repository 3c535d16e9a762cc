//! Transmit transaction manager.
//!
//! At most one outbound transaction exists. Its frames are built up front and
//! resubmitted every retransmit interval until the peer acknowledges, the
//! transaction times out, or the caller cancels it.

use std::time::{Duration, Instant};

use pbadv_core::constants::{
    CONT_PAYLOAD_MAX, START_PAYLOAD_MAX, last_segment_index, max_pdu_len, segment_count,
};
use pbadv_core::{Frame, GenericProv, LinkId, Pdu, TransactionId};

use crate::error::BearerError;
use crate::transport::FrameToken;

/// Transport-level repeats for reliably sent frames; the retransmit timer
/// provides the repetition instead.
pub const RELIABLE_RETRANSMITS: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Link Open, retried until Link Ack or `timeout`.
    LinkOpen { timeout: Duration },
    /// Generic Provisioning message awaiting a Transaction Ack.
    Message,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub frame: Frame,
    /// Queued in the transport and not yet reported complete.
    pub in_flight: Option<FrameToken>,
}

impl Segment {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            in_flight: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Outbound {
    pub kind: TxKind,
    pub xact_id: TransactionId,
    pub segments: Vec<Segment>,
    pub started: Instant,
}

/// Whether a transaction started `elapsed` ago should be abandoned.
pub fn is_transaction_expired_at(elapsed: Duration, timeout: Duration) -> bool {
    elapsed > timeout
}

/// Split `payload` into a Start frame and Continuation frames.
///
/// Rejects payloads needing more than `max_segments` frames before building
/// anything.
pub fn segment_message(
    link_id: LinkId,
    xact_id: TransactionId,
    payload: &[u8],
    fcs: u8,
    max_segments: usize,
) -> Result<Vec<Frame>, BearerError> {
    if payload.is_empty() {
        return Err(BearerError::EmptyMessage);
    }
    let too_large = || BearerError::MessageTooLarge {
        size: payload.len(),
        max: max_pdu_len(max_segments),
    };
    let count = segment_count(payload.len());
    if count > max_segments {
        return Err(too_large());
    }
    let total_len = u16::try_from(payload.len()).map_err(|_| too_large())?;

    let mut frames = Vec::with_capacity(count);
    let (head, mut rest) = payload.split_at(payload.len().min(START_PAYLOAD_MAX));
    let start = Pdu::new(
        link_id,
        xact_id,
        GenericProv::Start {
            last_seg: last_segment_index(payload.len()) as u8,
            total_len,
            fcs,
            data: head,
        },
    );
    frames.push(start.encode()?);

    let mut seg_index = 1u8;
    while !rest.is_empty() {
        let (chunk, tail) = rest.split_at(rest.len().min(CONT_PAYLOAD_MAX));
        let cont = Pdu::new(
            link_id,
            xact_id,
            GenericProv::Continuation {
                seg_index,
                data: chunk,
            },
        );
        frames.push(cont.encode()?);
        rest = tail;
        seg_index += 1;
    }

    Ok(frames)
}

#[derive(Debug)]
pub struct TxTransaction {
    last_id: TransactionId,
    current: Option<Outbound>,
}

impl TxTransaction {
    pub fn new(initial: TransactionId) -> Self {
        Self {
            last_id: initial,
            current: None,
        }
    }

    pub fn reset(&mut self, initial: TransactionId) {
        self.last_id = initial;
        self.current = None;
    }

    /// Id the next message will use. Only [`begin`](Self::begin) commits it.
    pub fn next_id(&self) -> TransactionId {
        self.last_id.next()
    }

    pub fn last_id(&self) -> TransactionId {
        self.last_id
    }

    pub fn current(&self) -> Option<&Outbound> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Outbound> {
        self.current.as_mut()
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Install a new outbound transaction, replacing any previous one.
    pub fn begin(&mut self, kind: TxKind, xact_id: TransactionId, frames: Vec<Frame>, now: Instant) {
        if kind == TxKind::Message {
            self.last_id = xact_id;
        }
        self.current = Some(Outbound {
            kind,
            xact_id,
            segments: frames.into_iter().map(Segment::new).collect(),
            started: now,
        });
    }

    /// Drop the outbound transaction and release its frames.
    pub fn clear(&mut self) -> Option<Outbound> {
        self.current.take()
    }

    /// Transport finished with `token`; the frame may be resubmitted.
    pub fn frame_complete(&mut self, token: FrameToken) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        match current
            .segments
            .iter_mut()
            .find(|segment| segment.in_flight == Some(token))
        {
            Some(segment) => {
                segment.in_flight = None;
                true
            }
            None => false,
        }
    }

    /// Whether the outbound transaction outlived its timeout at `now`.
    pub fn is_expired(&self, now: Instant, transaction_timeout: Duration) -> bool {
        self.current.as_ref().is_some_and(|current| {
            let timeout = match current.kind {
                TxKind::LinkOpen { timeout } => timeout,
                TxKind::Message => transaction_timeout,
            };
            is_transaction_expired_at(now.saturating_duration_since(current.started), timeout)
        })
    }

    pub fn held_segments(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |current| current.segments.len())
    }
}
