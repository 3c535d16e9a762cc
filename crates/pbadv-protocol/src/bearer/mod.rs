//! The PB-ADV bearer: link controller plus transaction managers behind one
//! single-owner handle.
//!
//! All entry points take the current time and run to completion. Results
//! that the session must see are queued as [`BearerEvent`]s and drained with
//! [`PbAdvBearer::poll_event`].

mod dispatch;
pub mod events;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use pbadv_core::constants::BEARER_CONTROL_XACT_ID;
use pbadv_core::{
    BearerControl, CloseReason, DeviceUuid, GenericProv, LinkId, Pdu, TransactionId,
};
use tracing::{debug, info, trace, warn};

use self::events::{BearerEvent, SendOutcome};
use crate::config::BearerConfig;
use crate::error::{BearerError, TransportError};
use crate::link::state::Link;
use crate::link::types::{LinkRole, LinkState, ProvError, Registration};
use crate::timer::{Timer, earliest};
use crate::transaction::rx::RxTransaction;
use crate::transaction::tx::{RELIABLE_RETRANSMITS, TxKind, TxTransaction, segment_message};
use crate::transport::{AdvTransport, FrameToken, MeshCrypto, ProvCrypto};

const CONTROL_XACT_ID: TransactionId = TransactionId::new(BEARER_CONTROL_XACT_ID);

/// Transaction id fields of (this side's tx, peer's rx) before any traffic.
fn initial_ids(role: LinkRole) -> (TransactionId, TransactionId) {
    match role {
        LinkRole::Provisioner => (
            TransactionId::PROVISIONER_INITIAL,
            TransactionId::DEVICE_INITIAL,
        ),
        LinkRole::Device => (
            TransactionId::DEVICE_INITIAL,
            TransactionId::PROVISIONER_INITIAL,
        ),
    }
}

/// One PB-ADV bearer: a single link plus its transmit and receive
/// transactions.
///
/// `T` carries frames to the advertiser and `C` supplies the FCS and link
/// ids. The bearer holds no clock; every time-dependent call takes `now`.
pub struct PbAdvBearer<T, C = MeshCrypto> {
    config: BearerConfig,
    transport: T,
    crypto: C,
    registration: Registration,
    link: Link,
    rx: RxTransaction,
    tx: TxTransaction,
    retransmit_timer: Timer,
    protocol_timer: Timer,
    events: VecDeque<BearerEvent>,
}

impl<T: AdvTransport, C: ProvCrypto> PbAdvBearer<T, C> {
    /// Create an idle, unregistered bearer.
    ///
    /// Allocates the reassembly buffer once at `config.rx_capacity`. Fails
    /// with [`BearerError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: BearerConfig, transport: T, crypto: C) -> Result<Self, BearerError> {
        config.validate()?;
        let (tx_initial, rx_initial) = initial_ids(LinkRole::Provisioner);
        Ok(Self {
            rx: RxTransaction::new(config.rx_capacity, rx_initial),
            tx: TxTransaction::new(tx_initial),
            config,
            transport,
            crypto,
            registration: Registration::None,
            link: Link::new(),
            retransmit_timer: Timer::new(),
            protocol_timer: Timer::new(),
            events: VecDeque::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Timing and capacity settings this bearer was built with.
    pub fn config(&self) -> &BearerConfig {
        &self.config
    }

    /// Current state of the link controller.
    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Id of the open (or opening, or closing) link; `None` while idle.
    pub fn link_id(&self) -> Option<LinkId> {
        (!self.link.is_idle()).then(|| self.link.id())
    }

    /// Side this bearer plays on the current link.
    pub fn role(&self) -> Option<LinkRole> {
        self.link.role()
    }

    /// Whether the peer sent a malformed transaction on this link. An
    /// invalid link acks later messages but no longer delivers them.
    pub fn is_invalid(&self) -> bool {
        self.link.is_invalid()
    }

    /// Who inbound frames are currently accepted for.
    pub fn registration(&self) -> Registration {
        self.registration
    }

    /// Transaction id of the outbound message in flight, if any.
    pub fn outbound_xact_id(&self) -> Option<TransactionId> {
        self.tx
            .current()
            .filter(|current| current.kind == TxKind::Message)
            .map(|current| current.xact_id)
    }

    /// Frames held for the outbound transaction.
    pub fn held_segments(&self) -> usize {
        self.tx.held_segments()
    }

    /// The transport passed to [`new`](Self::new).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access for drivers and tests that script the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -----------------------------------------------------------------------
    // Session-facing operations
    // -----------------------------------------------------------------------

    /// Open a link to the device advertising `uuid` (provisioner role).
    ///
    /// The Link Open is retried until the device acknowledges or `timeout`
    /// passes, in which case the link closes with [`CloseReason::Timeout`].
    pub fn open(
        &mut self,
        now: Instant,
        uuid: DeviceUuid,
        timeout: Duration,
    ) -> Result<(), BearerError> {
        self.transport.enable()?;
        if !self.link.is_idle() {
            return Err(BearerError::Busy);
        }

        let link_id = LinkId::new(self.crypto.random_u32());
        let frame = Pdu::new(
            link_id,
            CONTROL_XACT_ID,
            GenericProv::Control(BearerControl::LinkOpen(uuid)),
        )
        .encode()?;

        self.link.begin_open(link_id);
        let (tx_initial, rx_initial) = initial_ids(LinkRole::Provisioner);
        self.tx.reset(tx_initial);
        self.rx.reset(rx_initial);

        self.tx.begin(
            TxKind::LinkOpen { timeout },
            CONTROL_XACT_ID,
            vec![frame],
            now,
        );
        if let Err(err) = self.transmit_segments(now) {
            warn!(%link_id, error = %err, "failed to send link open");
            self.tx.clear();
            self.retransmit_timer.cancel();
            self.link.reset();
            return Err(err.into());
        }

        self.registration = Registration::Provisioner;
        self.protocol_timer.schedule(now, self.config.protocol_timeout);
        info!(%link_id, %uuid, "opening link");
        Ok(())
    }

    /// Wait for a Link Open addressed to `uuid` (device role).
    pub fn accept(&mut self, uuid: DeviceUuid) -> Result<(), BearerError> {
        self.transport.enable()?;
        if !self.link.is_idle() {
            return Err(BearerError::Busy);
        }

        let (tx_initial, rx_initial) = initial_ids(LinkRole::Device);
        self.tx.reset(tx_initial);
        self.rx.reset(rx_initial);
        self.registration = Registration::Device(uuid);
        info!(%uuid, "accepting provisioning links");
        Ok(())
    }

    /// Send one provisioning PDU on the active link.
    ///
    /// Any outbound message still in flight is cancelled first. Returns the
    /// transaction id whose [`BearerEvent::SendComplete`] will follow:
    /// [`SendOutcome::Acked`] on the peer's ack, [`SendOutcome::TimedOut`]
    /// after the transaction timeout, or [`SendOutcome::Cancelled`] if the
    /// message is superseded or dropped with the link.
    ///
    /// Fails without side effects when the link is not active, the payload
    /// is empty or too large for `max_tx_segments`, or the Start segment
    /// cannot be queued.
    pub fn send(&mut self, now: Instant, payload: &[u8]) -> Result<TransactionId, BearerError> {
        if self.link.state() != LinkState::Active {
            return Err(BearerError::LinkNotActive);
        }

        let xact_id = self.tx.next_id();
        let fcs = self.crypto.fcs(payload);
        let frames = segment_message(
            self.link.id(),
            xact_id,
            payload,
            fcs,
            self.config.max_tx_segments,
        )?;

        self.cancel_tx(SendOutcome::Cancelled);
        let previous = self.tx.last_id();
        self.tx.begin(TxKind::Message, xact_id, frames, now);
        if let Err(err) = self.transmit_segments(now) {
            warn!(link_id = %self.link.id(), xact_id = %xact_id, error = %err, "failed to send start segment");
            self.tx.reset(previous);
            self.retransmit_timer.cancel();
            return Err(err.into());
        }

        self.protocol_timer.schedule(now, self.config.protocol_timeout);
        debug!(
            link_id = %self.link.id(),
            xact_id = %xact_id,
            len = payload.len(),
            segments = self.tx.held_segments(),
            "sending message"
        );
        Ok(xact_id)
    }

    /// Start closing the link. No-op if idle or already closing.
    ///
    /// [`BearerEvent::LinkClosed`] with `reason` follows once the Link Close
    /// has been sent, fails to send, or the closing timeout passes.
    pub fn close(&mut self, now: Instant, reason: CloseReason) {
        match self.link.state() {
            LinkState::Idle | LinkState::Closing => return,
            LinkState::Opening | LinkState::Active => {}
        }

        info!(link_id = %self.link.id(), %reason, "closing link");
        self.cancel_tx(SendOutcome::Cancelled);
        self.link.begin_closing(reason);
        self.protocol_timer.schedule(now, self.config.closing_timeout);

        match self.send_control(BearerControl::LinkClose(reason), self.config.close_retransmits) {
            Ok(token) => self.link.set_close_frame(token),
            Err(err) => {
                warn!(link_id = %self.link.id(), error = %err, "failed to send link close");
                self.close_link(reason);
            }
        }
    }

    /// Abandon the outbound transaction without telling the peer.
    pub fn clear_tx(&mut self) {
        self.cancel_tx(SendOutcome::Cancelled);
    }

    /// Drop the link and registration without reporting a close.
    pub fn reset(&mut self) {
        self.reset_link();
        self.registration = Registration::None;
    }

    // -----------------------------------------------------------------------
    // Driver-facing operations
    // -----------------------------------------------------------------------

    /// Report the outcome of a frame previously queued with `transmit`.
    pub fn on_transmit_complete(&mut self, token: FrameToken, result: Result<(), TransportError>) {
        if let Err(err) = &result {
            debug!(%token, error = %err, "frame transmission failed");
        }

        if self.rx.ack_sent(token) {
            trace!(%token, "ack sent");
            return;
        }

        if let Some(reason) = self.link.close_frame_sent(token) {
            debug!(link_id = %self.link.id(), "link close sent");
            self.close_link(reason);
            return;
        }

        if self.tx.frame_complete(token) {
            trace!(%token, "segment sent");
        }
    }

    /// Fire every timer whose deadline is at or before `now`.
    pub fn handle_timeouts(&mut self, now: Instant) {
        if self.retransmit_timer.take_expired(now) {
            self.on_retransmit(now);
        }
        if self.protocol_timer.take_expired(now) {
            self.on_protocol_timeout(now);
        }
    }

    /// Earliest instant at which [`handle_timeouts`](Self::handle_timeouts)
    /// has work to do, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            self.retransmit_timer.deadline(),
            self.protocol_timer.deadline(),
        )
    }

    /// Pop the oldest queued event.
    ///
    /// Callers should drain events after every entry point; events from one
    /// call are queued in the order they happened.
    pub fn poll_event(&mut self) -> Option<BearerEvent> {
        self.events.pop_front()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn emit(&mut self, event: BearerEvent) {
        self.events.push_back(event);
    }

    /// Submit every outbound frame the transport is not already holding and
    /// re-arm the retransmit timer.
    ///
    /// Only a failure on the first frame is returned; later frames are
    /// picked up by the next cycle.
    fn transmit_segments(&mut self, now: Instant) -> Result<(), TransportError> {
        let Some(current) = self.tx.current_mut() else {
            return Ok(());
        };

        let mut first_err = None;
        for (index, segment) in current.segments.iter_mut().enumerate() {
            if segment.in_flight.is_some() {
                continue;
            }
            trace!(seg = index, frame = ?segment.frame.as_slice(), "transmitting segment");
            match self.transport.transmit(&segment.frame, RELIABLE_RETRANSMITS) {
                Ok(token) => segment.in_flight = Some(token),
                Err(err) => {
                    warn!(seg = index, error = %err, "segment transmit failed");
                    if index == 0 {
                        first_err = Some(err);
                    }
                }
            }
        }

        self.retransmit_timer
            .schedule(now, self.config.retransmit_interval);
        first_err.map_or(Ok(()), Err)
    }

    fn send_control(&mut self, ctl: BearerControl, retransmits: u8) -> Result<FrameToken, BearerError> {
        let frame = Pdu::new(
            self.link.id(),
            CONTROL_XACT_ID,
            GenericProv::Control(ctl),
        )
        .encode()?;
        Ok(self.transport.transmit(&frame, retransmits)?)
    }

    /// Acknowledge peer transaction `xact_id`, unless an ack for it is
    /// already queued.
    fn send_ack(&mut self, xact_id: TransactionId) {
        if self.rx.pending_ack() == Some(xact_id) {
            debug!(xact_id = %xact_id, "not sending duplicate ack");
            return;
        }

        let frame = match Pdu::new(self.link.id(), xact_id, GenericProv::Ack).encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "failed to encode ack");
                return;
            }
        };
        match self.transport.transmit(&frame, self.config.ack_retransmits) {
            Ok(token) => {
                debug!(link_id = %self.link.id(), xact_id = %xact_id, "sending ack");
                self.rx.set_pending_ack(xact_id, token);
            }
            Err(err) => warn!(xact_id = %xact_id, error = %err, "failed to send ack"),
        }
    }

    /// Drop the outbound transaction; a message reports `outcome`.
    fn cancel_tx(&mut self, outcome: SendOutcome) {
        self.retransmit_timer.cancel();
        if let Some(current) = self.tx.clear()
            && current.kind == TxKind::Message
        {
            self.emit(BearerEvent::SendComplete {
                xact_id: current.xact_id,
                outcome,
            });
        }
    }

    /// Return to idle, keeping a device registration so the next Link Open
    /// is accepted.
    fn reset_link(&mut self) {
        self.cancel_tx(SendOutcome::Cancelled);
        self.protocol_timer.cancel();

        let role = match self.registration {
            Registration::Device(_) => LinkRole::Device,
            Registration::Provisioner | Registration::None => {
                self.registration = Registration::None;
                LinkRole::Provisioner
            }
        };
        let (tx_initial, rx_initial) = initial_ids(role);
        self.tx.reset(tx_initial);
        self.rx.reset(rx_initial);
        self.link.reset();
    }

    fn close_link(&mut self, reason: CloseReason) {
        info!(link_id = %self.link.id(), %reason, "link closed");
        self.reset_link();
        self.emit(BearerEvent::LinkClosed(reason));
    }

    /// Peer violated the protocol: report, invalidate and close.
    fn fail(&mut self, now: Instant, err: ProvError) {
        self.emit(BearerEvent::ProtocolError(err));
        self.link.mark_invalid();
        self.close(now, CloseReason::Fail);
    }

    fn on_retransmit(&mut self, now: Instant) {
        if self.link.is_idle() {
            return;
        }
        let Some(kind) = self.tx.current().map(|current| current.kind) else {
            return;
        };

        if self.tx.is_expired(now, self.config.transaction_timeout) {
            match kind {
                TxKind::LinkOpen { .. } => {
                    warn!(link_id = %self.link.id(), "giving up link open");
                    self.cancel_tx(SendOutcome::TimedOut);
                    self.close(now, CloseReason::Timeout);
                }
                TxKind::Message => {
                    warn!(link_id = %self.link.id(), "giving up transaction");
                    self.cancel_tx(SendOutcome::TimedOut);
                }
            }
            return;
        }

        if let Err(err) = self.transmit_segments(now) {
            debug!(error = %err, "retransmission deferred");
        }
    }

    fn on_protocol_timeout(&mut self, now: Instant) {
        match self.link.state() {
            LinkState::Idle => {}
            LinkState::Closing => {
                let reason = self
                    .link
                    .closing()
                    .map_or(CloseReason::Fail, |closing| closing.reason);
                debug!(link_id = %self.link.id(), "closing timed out");
                self.close_link(reason);
            }
            LinkState::Opening | LinkState::Active => {
                warn!(link_id = %self.link.id(), "protocol timeout");
                self.close(now, CloseReason::Timeout);
            }
        }
    }
}
