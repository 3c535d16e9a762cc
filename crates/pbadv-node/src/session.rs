//! Minimal provisioning session run on top of a bearer.
//!
//! The provisioner opens a link, sends each configured PDU and waits for the
//! device's reply before sending the next, then closes with `Success`. The
//! device echoes every PDU it receives and finishes when the link closes.
//! This stands in for the provisioning protocol layer, which is out of
//! scope here.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use pbadv_core::{CloseReason, DeviceUuid};
use pbadv_protocol::{AdvTransport, BearerEvent, PbAdvBearer, ProvCrypto, ProvError, SendOutcome};
use tracing::{debug, info, warn};

use crate::config::{NodeConfig, Role};
use crate::error::NodeError;

/// What happened during one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Messages accepted by `send`, in order.
    pub sent: Vec<Vec<u8>>,
    pub received: Vec<Vec<u8>>,
    pub outcomes: Vec<SendOutcome>,
    pub protocol_errors: Vec<ProvError>,
    /// `None` if the session ended before the link closed.
    pub close_reason: Option<CloseReason>,
}

#[derive(Debug)]
pub struct Session {
    role: Role,
    uuid: DeviceUuid,
    open_timeout: Duration,
    pending: VecDeque<Vec<u8>>,
    awaiting_reply: bool,
    finished: bool,
    report: SessionReport,
}

impl Session {
    pub fn provisioner(uuid: DeviceUuid, open_timeout: Duration, payloads: Vec<Vec<u8>>) -> Self {
        Self::with_role(Role::Provisioner, uuid, open_timeout, payloads)
    }

    pub fn device(uuid: DeviceUuid) -> Self {
        Self::with_role(Role::Device, uuid, Duration::ZERO, Vec::new())
    }

    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let uuid = config.device_uuid()?;
        Ok(match config.node.role {
            Role::Provisioner => Self::provisioner(
                uuid,
                config.session.open_timeout(),
                config.session.decoded_payloads()?,
            ),
            Role::Device => Self::device(uuid),
        })
    }

    fn with_role(
        role: Role,
        uuid: DeviceUuid,
        open_timeout: Duration,
        payloads: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            role,
            uuid,
            open_timeout,
            pending: payloads.into(),
            awaiting_reply: false,
            finished: false,
            report: SessionReport::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    pub fn into_report(self) -> SessionReport {
        self.report
    }

    /// Open the link (provisioner) or register for Link Open (device).
    pub fn start<T: AdvTransport, C: ProvCrypto>(
        &mut self,
        bearer: &mut PbAdvBearer<T, C>,
        now: Instant,
    ) -> Result<(), NodeError> {
        match self.role {
            Role::Provisioner => bearer.open(now, self.uuid, self.open_timeout)?,
            Role::Device => bearer.accept(self.uuid)?,
        }
        Ok(())
    }

    pub fn on_event<T: AdvTransport, C: ProvCrypto>(
        &mut self,
        event: BearerEvent,
        bearer: &mut PbAdvBearer<T, C>,
        now: Instant,
    ) {
        match event {
            BearerEvent::LinkOpened => {
                info!(role = ?self.role, "session link opened");
                if self.role == Role::Provisioner {
                    self.send_next(bearer, now);
                }
            }
            BearerEvent::MessageReceived(message) => {
                debug!(len = message.len(), "session received message");
                self.report.received.push(message.clone());
                match self.role {
                    Role::Device => self.send(bearer, now, message),
                    Role::Provisioner if self.awaiting_reply => {
                        self.awaiting_reply = false;
                        self.send_next(bearer, now);
                    }
                    Role::Provisioner => warn!("unsolicited message from device"),
                }
            }
            BearerEvent::SendComplete { xact_id, outcome } => {
                debug!(xact_id = %xact_id, ?outcome, "session send complete");
                self.report.outcomes.push(outcome);
                if self.role == Role::Provisioner && outcome == SendOutcome::TimedOut {
                    bearer.close(now, CloseReason::Fail);
                }
            }
            BearerEvent::ProtocolError(err) => {
                warn!(error = %err, "session saw protocol error");
                self.report.protocol_errors.push(err);
            }
            BearerEvent::LinkClosed(reason) => {
                info!(role = ?self.role, %reason, "session finished");
                self.report.close_reason = Some(reason);
                self.finished = true;
            }
        }
    }

    fn send_next<T: AdvTransport, C: ProvCrypto>(
        &mut self,
        bearer: &mut PbAdvBearer<T, C>,
        now: Instant,
    ) {
        match self.pending.pop_front() {
            Some(payload) => {
                self.send(bearer, now, payload);
                self.awaiting_reply = true;
            }
            None => bearer.close(now, CloseReason::Success),
        }
    }

    fn send<T: AdvTransport, C: ProvCrypto>(
        &mut self,
        bearer: &mut PbAdvBearer<T, C>,
        now: Instant,
        payload: Vec<u8>,
    ) {
        match bearer.send(now, &payload) {
            Ok(_) => self.report.sent.push(payload),
            Err(err) => {
                warn!(error = %err, len = payload.len(), "session send failed");
                if self.role == Role::Provisioner {
                    bearer.close(now, CloseReason::Fail);
                }
            }
        }
    }
}
