//! Shared fixtures for bearer integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use pbadv_core::{
    BearerControl, CloseReason, DeviceUuid, GenericProv, LinkId, Pdu, TransactionId,
};
use pbadv_protocol::testing::{MockTransport, SentFrame, drain_events, seeded_crypto};
use pbadv_protocol::transaction::tx::segment_message;
use pbadv_protocol::{BearerConfig, BearerEvent, MeshCrypto, PbAdvBearer};
use rand::rngs::StdRng;

pub type TestBearer = PbAdvBearer<MockTransport, MeshCrypto<StdRng>>;

pub const UUID: DeviceUuid = DeviceUuid::new([0x11; 16]);
pub const OTHER_UUID: DeviceUuid = DeviceUuid::new([0x22; 16]);
pub const LINK: LinkId = LinkId::new(0x1234_5678);
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

pub fn bearer_with(config: BearerConfig, seed: u64) -> TestBearer {
    PbAdvBearer::new(config, MockTransport::new(), seeded_crypto(seed)).unwrap()
}

pub fn bearer() -> TestBearer {
    bearer_with(BearerConfig::default(), 1)
}

pub fn control_frame(link_id: LinkId, ctl: BearerControl) -> Vec<u8> {
    Pdu::new(link_id, TransactionId::new(0), GenericProv::Control(ctl))
        .encode()
        .unwrap()
        .to_vec()
}

pub fn ack_frame(link_id: LinkId, xact_id: TransactionId) -> Vec<u8> {
    Pdu::new(link_id, xact_id, GenericProv::Ack)
        .encode()
        .unwrap()
        .to_vec()
}

/// Frames a correct peer would send for `payload`.
pub fn message_frames(link_id: LinkId, xact_id: TransactionId, payload: &[u8]) -> Vec<Vec<u8>> {
    segment_message(
        link_id,
        xact_id,
        payload,
        pbadv_crypto::fcs_calc(payload),
        32,
    )
    .unwrap()
    .into_iter()
    .map(|frame| frame.to_vec())
    .collect()
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

/// Device that has accepted `LINK` from a provisioner.
pub fn active_device(now: Instant) -> TestBearer {
    active_device_with(BearerConfig::default(), now)
}

pub fn active_device_with(config: BearerConfig, now: Instant) -> TestBearer {
    let mut device = bearer_with(config, 2);
    device.accept(UUID).unwrap();
    device.handle_frame(now, &control_frame(LINK, BearerControl::LinkOpen(UUID)));
    assert_eq!(drain_events(&mut device), vec![BearerEvent::LinkOpened]);
    device.transport_mut().take_sent();
    device
}

/// Provisioner whose Link Open has been acknowledged.
pub fn active_provisioner(now: Instant) -> TestBearer {
    let mut provisioner = bearer();
    provisioner.open(now, UUID, OPEN_TIMEOUT).unwrap();
    let link_id = provisioner.link_id().unwrap();
    provisioner.handle_frame(now, &control_frame(link_id, BearerControl::LinkAck));
    assert_eq!(drain_events(&mut provisioner), vec![BearerEvent::LinkOpened]);
    provisioner.transport_mut().take_sent();
    provisioner
}

/// Owned summary of a transmitted frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Start { xact: u8, total_len: u16 },
    Ack { xact: u8 },
    Cont { xact: u8, seg: u8 },
    Open(DeviceUuid),
    LinkAck,
    Close(CloseReason),
}

pub fn describe(frame: &SentFrame) -> Sent {
    let pdu = frame.pdu().unwrap();
    let xact = pdu.xact_id.get();
    match pdu.body {
        GenericProv::Start { total_len, .. } => Sent::Start { xact, total_len },
        GenericProv::Ack => Sent::Ack { xact },
        GenericProv::Continuation { seg_index, .. } => Sent::Cont {
            xact,
            seg: seg_index,
        },
        GenericProv::Control(BearerControl::LinkOpen(uuid)) => Sent::Open(uuid),
        GenericProv::Control(BearerControl::LinkAck) => Sent::LinkAck,
        GenericProv::Control(BearerControl::LinkClose(reason)) => Sent::Close(reason),
    }
}

pub fn take_described(bearer: &mut TestBearer) -> Vec<Sent> {
    bearer.transport_mut().take_sent().iter().map(describe).collect()
}

/// Report every recorded frame as sent and return the frames.
pub fn complete_all(bearer: &mut TestBearer) -> Vec<SentFrame> {
    let sent = bearer.transport_mut().take_sent();
    for frame in &sent {
        bearer.on_transmit_complete(frame.token, Ok(()));
    }
    sent
}

/// Move frames from `from` to `to`, completing them on the sender.
/// `keep` decides per frame (in send order) whether it reaches `to`.
pub fn pump(
    from: &mut TestBearer,
    to: &mut TestBearer,
    now: Instant,
    mut keep: impl FnMut(usize, &SentFrame) -> bool,
) -> usize {
    let sent = complete_all(from);
    let mut delivered = 0;
    for (index, frame) in sent.iter().enumerate() {
        if keep(index, frame) {
            to.handle_frame(now, &frame.bytes);
            delivered += 1;
        }
    }
    delivered
}
