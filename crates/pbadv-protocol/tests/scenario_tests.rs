//! End-to-end sessions between a provisioner and a device bearer wired
//! back to back.

mod common;

use std::time::{Duration, Instant};

use common::*;
use pbadv_core::CloseReason;
use pbadv_protocol::testing::drain_events;
use pbadv_protocol::{BearerConfig, BearerEvent, LinkState, SendOutcome};

fn open_pair(config: BearerConfig, now: Instant) -> (TestBearer, TestBearer) {
    let mut provisioner = bearer_with(config.clone(), 10);
    let mut device = bearer_with(config, 20);
    device.accept(UUID).unwrap();
    provisioner.open(now, UUID, OPEN_TIMEOUT).unwrap();

    pump(&mut provisioner, &mut device, now, |_, _| true);
    pump(&mut device, &mut provisioner, now, |_, _| true);

    assert_eq!(drain_events(&mut device), vec![BearerEvent::LinkOpened]);
    assert_eq!(drain_events(&mut provisioner), vec![BearerEvent::LinkOpened]);
    (provisioner, device)
}

#[test]
fn hundred_byte_message_survives_lost_continuation() {
    let config = BearerConfig {
        max_tx_segments: 5,
        rx_capacity: 100,
        ..Default::default()
    };
    let start = Instant::now();
    let (mut provisioner, mut device) = open_pair(config, start);

    let data = payload(100);
    let xact_id = provisioner.send(start, &data).unwrap();
    assert_eq!(provisioner.held_segments(), 5);

    // Start + 4 continuations; the third continuation is lost.
    let delivered = pump(&mut provisioner, &mut device, start, |index, _| index != 3);
    assert_eq!(delivered, 4);
    assert!(drain_events(&mut device).is_empty());
    assert!(device.transport().sent().is_empty());

    let retry = start + Duration::from_millis(500);
    provisioner.handle_timeouts(retry);
    assert_eq!(provisioner.transport().sent().len(), 5);
    pump(&mut provisioner, &mut device, retry, |_, _| true);

    assert_eq!(
        drain_events(&mut device),
        vec![BearerEvent::MessageReceived(data)]
    );
    assert_eq!(take_described_keep(&device), vec![Sent::Ack { xact: 0 }]);

    pump(&mut device, &mut provisioner, retry, |_, _| true);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::Acked
        }]
    );
    assert_eq!(provisioner.held_segments(), 0);
}

fn take_described_keep(bearer: &TestBearer) -> Vec<Sent> {
    bearer.transport().sent().iter().map(describe).collect()
}

#[test]
fn full_session_with_lost_link_ack() {
    let now = Instant::now();
    let mut provisioner = bearer_with(BearerConfig::default(), 10);
    let mut device = bearer_with(BearerConfig::default(), 20);
    device.accept(UUID).unwrap();
    provisioner.open(now, UUID, OPEN_TIMEOUT).unwrap();

    // First Link Ack is lost.
    pump(&mut provisioner, &mut device, now, |_, _| true);
    pump(&mut device, &mut provisioner, now, |_, _| false);
    assert_eq!(drain_events(&mut device), vec![BearerEvent::LinkOpened]);
    assert!(drain_events(&mut provisioner).is_empty());

    let t1 = now + Duration::from_millis(500);
    provisioner.handle_timeouts(t1);
    pump(&mut provisioner, &mut device, t1, |_, _| true);
    pump(&mut device, &mut provisioner, t1, |_, _| true);
    assert_eq!(drain_events(&mut provisioner), vec![BearerEvent::LinkOpened]);
    assert!(drain_events(&mut device).is_empty());
    assert_eq!(device.link_state(), LinkState::Active);

    // Invite, reply, close.
    let invite = vec![0x00, 0x05];
    let xact_id = provisioner.send(t1, &invite).unwrap();
    pump(&mut provisioner, &mut device, t1, |_, _| true);
    assert_eq!(
        drain_events(&mut device),
        vec![BearerEvent::MessageReceived(invite)]
    );
    pump(&mut device, &mut provisioner, t1, |_, _| true);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::Acked
        }]
    );

    let capabilities = payload(12);
    device.send(t1, &capabilities).unwrap();
    pump(&mut device, &mut provisioner, t1, |_, _| true);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::MessageReceived(capabilities)]
    );
    pump(&mut provisioner, &mut device, t1, |_, _| true);
    assert!(matches!(
        drain_events(&mut device).as_slice(),
        [BearerEvent::SendComplete {
            outcome: SendOutcome::Acked,
            ..
        }]
    ));

    provisioner.close(t1, CloseReason::Success);
    pump(&mut provisioner, &mut device, t1, |_, _| true);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::LinkClosed(CloseReason::Success)]
    );
    assert_eq!(
        drain_events(&mut device),
        vec![BearerEvent::LinkClosed(CloseReason::Success)]
    );
    assert_eq!(provisioner.link_state(), LinkState::Idle);
    assert_eq!(device.link_state(), LinkState::Idle);
}

#[test]
fn lost_ack_recovered_by_retransmission() {
    let now = Instant::now();
    let (mut provisioner, mut device) = open_pair(BearerConfig::default(), now);

    let data = payload(40);
    let xact_id = provisioner.send(now, &data).unwrap();
    pump(&mut provisioner, &mut device, now, |_, _| true);
    assert_eq!(
        drain_events(&mut device),
        vec![BearerEvent::MessageReceived(data)]
    );
    // Ack lost on the air, but it did leave the device.
    pump(&mut device, &mut provisioner, now, |_, _| false);

    let t1 = now + Duration::from_millis(500);
    provisioner.handle_timeouts(t1);
    pump(&mut provisioner, &mut device, t1, |_, _| true);
    assert!(drain_events(&mut device).is_empty());
    pump(&mut device, &mut provisioner, t1, |_, _| true);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::Acked
        }]
    );
}
