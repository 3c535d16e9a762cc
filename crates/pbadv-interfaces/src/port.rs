//! Channel-backed [`AdvTransport`] and the advertiser loop that drains it.
//!
//! ```text
//!  bearer ──transmit──▶ ChannelTransport ──OutboundFrame──▶ run_advertiser ──▶ Radio
//!    ▲                                                           │
//!    └──────────── on_transmit_complete ◀──── Completion ◀───────┘
//! ```
//!
//! Each queued frame holds one permit of the transport's frame pool until
//! the advertiser has finished repeating it, so `transmit` fails with
//! [`TransportError::NoBuffers`] once the pool is drained.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pbadv_protocol::{AdvTransport, FrameToken, TransportError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError, mpsc, watch};
use tracing::{debug, trace, warn};

use crate::error::InterfaceError;

/// Gap between repeats of the same frame.
pub const DEFAULT_ADV_INTERVAL: Duration = Duration::from_millis(20);

/// Frames that may be queued or on air at once.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Depth of the inbound frame queue before frames are dropped.
pub const INBOUND_QUEUE: usize = 64;

/// Something that can put one frame on the air.
pub trait Radio: Send + 'static {
    fn broadcast(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), InterfaceError>> + Send;
}

/// A frame waiting for the advertiser.
#[derive(Debug)]
pub struct OutboundFrame {
    pub token: FrameToken,
    pub bytes: Vec<u8>,
    pub retransmits: u8,
    _permit: OwnedSemaphorePermit,
}

/// Outcome of one [`OutboundFrame`], to be fed to
/// [`PbAdvBearer::on_transmit_complete`](pbadv_protocol::PbAdvBearer::on_transmit_complete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub token: FrameToken,
    pub result: Result<(), TransportError>,
}

/// Everything a bearer driver needs from one advertising station.
#[derive(Debug)]
pub struct AdvPort {
    pub transport: ChannelTransport,
    pub inbound: mpsc::Receiver<Vec<u8>>,
    pub completions: mpsc::UnboundedReceiver<Completion>,
}

#[derive(Debug)]
pub struct ChannelTransport {
    frames: mpsc::UnboundedSender<OutboundFrame>,
    pool: Arc<Semaphore>,
    next_token: u64,
}

impl ChannelTransport {
    pub fn new(pool_size: usize) -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (frames, rx) = mpsc::unbounded_channel();
        let transport = Self {
            frames,
            pool: Arc::new(Semaphore::new(pool_size)),
            next_token: 0,
        };
        (transport, rx)
    }

    /// Free frame buffers.
    pub fn available(&self) -> usize {
        self.pool.available_permits()
    }
}

impl AdvTransport for ChannelTransport {
    fn enable(&mut self) -> Result<(), TransportError> {
        if self.frames.is_closed() {
            return Err(TransportError::Disabled);
        }
        Ok(())
    }

    fn transmit(&mut self, frame: &[u8], retransmits: u8) -> Result<FrameToken, TransportError> {
        let permit = Arc::clone(&self.pool)
            .try_acquire_owned()
            .map_err(|err| match err {
                TryAcquireError::NoPermits => TransportError::NoBuffers,
                TryAcquireError::Closed => TransportError::Disabled,
            })?;

        self.next_token += 1;
        let token = FrameToken::new(self.next_token);
        self.frames
            .send(OutboundFrame {
                token,
                bytes: frame.to_vec(),
                retransmits,
                _permit: permit,
            })
            .map_err(|_| TransportError::Disabled)?;
        trace!(%token, len = frame.len(), retransmits, "frame queued");
        Ok(token)
    }
}

/// Drain `frames`, broadcasting each one `1 + retransmits` times spaced by
/// `interval`, until the transport is dropped or `stop` fires.
pub async fn run_advertiser<R: Radio>(
    mut radio: R,
    mut frames: mpsc::UnboundedReceiver<OutboundFrame>,
    completions: mpsc::UnboundedSender<Completion>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let frame = tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = stop.changed() => break,
        };

        let result = advertise(&mut radio, &frame, interval).await;
        if let Err(err) = &result {
            warn!(token = %frame.token, error = %err, "advertising failed");
        }
        let token = frame.token;
        // Release the pool slot before the bearer hears about it.
        drop(frame);

        if completions.send(Completion { token, result }).is_err() {
            break;
        }
    }
    debug!("advertiser stopped");
}

async fn advertise<R: Radio>(
    radio: &mut R,
    frame: &OutboundFrame,
    interval: Duration,
) -> Result<(), TransportError> {
    for attempt in 0..=frame.retransmits {
        if attempt > 0 {
            tokio::time::sleep(interval).await;
        }
        trace!(token = %frame.token, attempt, "advertising");
        radio.broadcast(&frame.bytes).await?;
    }
    Ok(())
}
