//! Test doubles for driving a bearer without a radio.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pbadv_protocol::testing::{MockTransport, drain_events, seeded_crypto};
//!
//! let mut bearer = PbAdvBearer::new(config, MockTransport::new(), seeded_crypto(1))?;
//! bearer.accept(uuid)?;
//! bearer.handle_frame(now, &open_frame);
//! let sent = bearer.transport_mut().take_sent();
//! ```

use std::collections::VecDeque;

use pbadv_core::{Pdu, PduError};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bearer::PbAdvBearer;
use crate::bearer::events::BearerEvent;
use crate::error::TransportError;
use crate::transport::{AdvTransport, FrameToken, MeshCrypto, ProvCrypto};

/// One frame handed to [`MockTransport::transmit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub token: FrameToken,
    pub bytes: Vec<u8>,
    pub retransmits: u8,
}

impl SentFrame {
    pub fn pdu(&self) -> Result<Pdu<'_>, PduError> {
        Pdu::parse(&self.bytes)
    }
}

/// Transport that records every frame and never completes on its own.
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<SentFrame>,
    next_token: u64,
    script: VecDeque<Option<TransportError>>,
    enable_error: Option<TransportError>,
    enabled: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[SentFrame] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<SentFrame> {
        std::mem::take(&mut self.sent)
    }

    /// Make the next unscripted `transmit` fail with `err`. Calls queue up.
    pub fn fail_next(&mut self, err: TransportError) {
        self.script.push_back(Some(err));
    }

    /// Let the next unscripted `transmit` succeed; used to aim a later
    /// [`fail_next`](Self::fail_next) at a specific frame.
    pub fn pass_next(&mut self) {
        self.script.push_back(None);
    }

    pub fn fail_enable(&mut self, err: TransportError) {
        self.enable_error = Some(err);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl AdvTransport for MockTransport {
    fn enable(&mut self) -> Result<(), TransportError> {
        if let Some(err) = self.enable_error.clone() {
            return Err(err);
        }
        self.enabled = true;
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8], retransmits: u8) -> Result<FrameToken, TransportError> {
        if let Some(Some(err)) = self.script.pop_front() {
            return Err(err);
        }
        self.next_token += 1;
        let token = FrameToken::new(self.next_token);
        self.sent.push(SentFrame {
            token,
            bytes: frame.to_vec(),
            retransmits,
        });
        Ok(token)
    }
}

/// Deterministic crypto for reproducible link ids.
pub fn seeded_crypto(seed: u64) -> MeshCrypto<StdRng> {
    MeshCrypto::with_rng(StdRng::seed_from_u64(seed))
}

/// Pop every queued event.
pub fn drain_events<T: AdvTransport, C: ProvCrypto>(bearer: &mut PbAdvBearer<T, C>) -> Vec<BearerEvent> {
    std::iter::from_fn(|| bearer.poll_event()).collect()
}
