//! Inbound frame dispatch.
//!
//! One exhaustive match over the four Generic Provisioning formats; each arm
//! guards its own preconditions.

use std::time::Instant;

use pbadv_core::{BearerControl, CloseReason, DeviceUuid, GenericProv, LinkId, Pdu, TransactionId};
use tracing::{debug, error, info, trace, warn};

use super::PbAdvBearer;
use super::events::{BearerEvent, SendOutcome};
use crate::link::types::{LinkRole, LinkState, ProvError, Registration};
use crate::transaction::rx::{Malformed, RxEvent};
use crate::transaction::tx::TxKind;
use crate::transport::{AdvTransport, ProvCrypto};

impl<T: AdvTransport, C: ProvCrypto> PbAdvBearer<T, C> {
    /// Process one received advertising payload.
    ///
    /// Frames are ignored until [`open`](Self::open) or
    /// [`accept`](Self::accept) registers the bearer, and frames for a
    /// foreign link id are ignored once a link exists. Undecodable frames
    /// are dropped with a log line; structural violations inside a
    /// transaction surface as [`BearerEvent::ProtocolError`] and close the
    /// link with [`CloseReason::Fail`].
    pub fn handle_frame(&mut self, now: Instant, bytes: &[u8]) {
        if self.registration == Registration::None {
            return;
        }

        let pdu = match Pdu::parse(bytes) {
            Ok(pdu) => pdu,
            Err(err) => {
                debug!(len = bytes.len(), error = %err, "dropping undecodable frame");
                return;
            }
        };

        if !self.link.accepts(pdu.link_id) {
            trace!(link_id = %pdu.link_id, "ignoring frame for foreign link");
            return;
        }

        trace!(link_id = %pdu.link_id, xact_id = %pdu.xact_id, gpc = ?pdu.body.gpc(), "frame");

        if pdu.body.gpc().format().requires_link() && self.link.is_idle() {
            debug!("ignoring message that requires an active link");
            return;
        }

        match pdu.body {
            GenericProv::Start {
                last_seg,
                total_len,
                fcs,
                data,
            } => {
                let result = self.rx.on_start(pdu.xact_id, last_seg, total_len, fcs, data);
                self.after_rx(now, pdu.xact_id, result);
            }
            GenericProv::Continuation { seg_index, data } => {
                let result = self.rx.on_continuation(pdu.xact_id, seg_index, data);
                self.after_rx(now, pdu.xact_id, result);
            }
            GenericProv::Ack => self.on_transaction_ack(pdu.xact_id),
            GenericProv::Control(BearerControl::LinkOpen(uuid)) => {
                self.on_link_open(now, pdu.link_id, uuid)
            }
            GenericProv::Control(BearerControl::LinkAck) => self.on_link_ack(),
            GenericProv::Control(BearerControl::LinkClose(reason)) => self.on_link_close(reason),
        }
    }

    fn after_rx(&mut self, now: Instant, xact_id: TransactionId, result: Result<RxEvent, Malformed>) {
        let link_id = self.link.id();
        match result {
            Err(err) => {
                error!(%link_id, xact_id = %xact_id, error = %err, "malformed transaction");
                self.fail(now, ProvError::InvalidFormat);
            }
            Ok(RxEvent::Unexpected { expected }) => {
                warn!(%link_id, xact_id = %xact_id, expected = %expected, "unexpected transaction");
            }
            Ok(RxEvent::Duplicate) => {
                if self.rx.pending_ack().is_none() {
                    debug!(%link_id, xact_id = %xact_id, "resending ack");
                    self.send_ack(xact_id);
                }
            }
            Ok(RxEvent::Redundant) => {
                trace!(%link_id, xact_id = %xact_id, "ignoring already received segment");
            }
            Ok(RxEvent::OutOfRange) => {
                debug!(%link_id, xact_id = %xact_id, "dropping continuation beyond reassembly capacity");
            }
            Ok(RxEvent::Stored { began }) => {
                if began {
                    self.retire_tx();
                }
            }
            Ok(RxEvent::Complete { began }) => {
                if began {
                    self.retire_tx();
                }
                self.deliver(now, xact_id);
            }
        }
    }

    /// The peer moved on to its next transaction, so it has everything we
    /// were still retransmitting.
    fn retire_tx(&mut self) {
        if self.tx.is_busy() {
            debug!(link_id = %self.link.id(), "peer started a new transaction, clearing tx");
            self.cancel_tx(SendOutcome::Cancelled);
        }
    }

    fn deliver(&mut self, now: Instant, xact_id: TransactionId) {
        // While closing, this timer bounds the teardown instead.
        if matches!(self.link.state(), LinkState::Opening | LinkState::Active) {
            self.protocol_timer.schedule(now, self.config.protocol_timeout);
        }

        if !self.crypto.fcs_check(self.rx.message(), self.rx.expected_fcs()) {
            warn!(
                link_id = %self.link.id(),
                xact_id = %xact_id,
                expected = self.rx.expected_fcs(),
                "incorrect FCS"
            );
            self.rx.discard();
            return;
        }

        self.send_ack(xact_id);

        if self.link.is_invalid() {
            warn!(link_id = %self.link.id(), xact_id = %xact_id, "message on invalidated link");
            self.emit(BearerEvent::ProtocolError(ProvError::UnexpectedPdu));
            return;
        }

        debug!(link_id = %self.link.id(), xact_id = %xact_id, len = self.rx.message().len(), "message received");
        let message = self.rx.message().to_vec();
        self.emit(BearerEvent::MessageReceived(message));
    }

    fn on_transaction_ack(&mut self, xact_id: TransactionId) {
        let matches = self
            .tx
            .current()
            .is_some_and(|current| current.kind == TxKind::Message && current.xact_id == xact_id);
        if !matches {
            trace!(xact_id = %xact_id, "ignoring ack for unknown transaction");
            return;
        }

        debug!(link_id = %self.link.id(), xact_id = %xact_id, "transaction acknowledged");
        self.cancel_tx(SendOutcome::Acked);
    }

    fn on_link_open(&mut self, now: Instant, link_id: LinkId, uuid: DeviceUuid) {
        let Registration::Device(local) = self.registration else {
            trace!("ignoring link open: not accepting");
            return;
        };

        match self.link.state() {
            LinkState::Idle => {
                if uuid != local {
                    trace!(%uuid, "link open not for us");
                    return;
                }

                self.link.accept_open(link_id);
                self.protocol_timer.schedule(now, self.config.protocol_timeout);
                if let Err(err) = self.send_control(BearerControl::LinkAck, self.config.ack_retransmits) {
                    warn!(%link_id, error = %err, "failed to send link ack");
                    self.reset_link();
                    return;
                }

                info!(%link_id, "link opened");
                self.emit(BearerEvent::LinkOpened);
            }
            LinkState::Active if self.link.role() == Some(LinkRole::Device) => {
                debug!(%link_id, "resending link ack");
                if let Err(err) = self.send_control(BearerControl::LinkAck, self.config.ack_retransmits) {
                    debug!(%link_id, error = %err, "link ack resend failed");
                }
            }
            state => {
                debug!(%link_id, state = state.name(), "ignoring link open");
            }
        }
    }

    fn on_link_ack(&mut self) {
        if self.link.role() != Some(LinkRole::Provisioner) {
            return;
        }
        if self.link.state() != LinkState::Opening {
            trace!(link_id = %self.link.id(), "ignoring duplicate link ack");
            return;
        }

        self.cancel_tx(SendOutcome::Cancelled);
        self.link.activate();
        info!(link_id = %self.link.id(), "link opened");
        self.emit(BearerEvent::LinkOpened);
    }

    fn on_link_close(&mut self, reason: CloseReason) {
        if self.link.is_idle() {
            return;
        }
        debug!(link_id = %self.link.id(), %reason, "link close received");
        self.close_link(reason);
    }
}
