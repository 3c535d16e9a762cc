//! Transmit transaction manager through the bearer.

mod common;

use std::time::{Duration, Instant};

use common::*;
use pbadv_core::{BearerControl, CloseReason, TransactionId};
use pbadv_protocol::testing::drain_events;
use pbadv_protocol::{BearerError, BearerEvent, LinkState, SendOutcome, TransportError};

#[test]
fn send_requires_active_link() {
    let now = Instant::now();
    let mut provisioner = bearer();
    assert!(matches!(
        provisioner.send(now, &[1]),
        Err(BearerError::LinkNotActive)
    ));
    provisioner.open(now, UUID, OPEN_TIMEOUT).unwrap();
    assert!(matches!(
        provisioner.send(now, &[1]),
        Err(BearerError::LinkNotActive)
    ));
}

#[test]
fn single_segment_message() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let xact_id = provisioner.send(now, &[0x03, 0x01, 0x02]).unwrap();
    assert_eq!(xact_id, TransactionId::new(0x00));
    assert_eq!(provisioner.outbound_xact_id(), Some(xact_id));

    let sent = provisioner.transport().sent().to_vec();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        describe(&sent[0]),
        Sent::Start {
            xact: 0,
            total_len: 3
        }
    );
    assert_eq!(sent[0].retransmits, 0);
}

#[test]
fn device_uses_upper_id_space() {
    let now = Instant::now();
    let mut device = active_device(now);
    assert_eq!(device.send(now, &[1]).unwrap(), TransactionId::new(0x80));
    device.handle_frame(now, &ack_frame(LINK, TransactionId::new(0x80)));
    assert_eq!(device.send(now, &[2]).unwrap(), TransactionId::new(0x81));
}

#[test]
fn empty_and_oversize_rejected_before_transmit() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    assert!(matches!(
        provisioner.send(now, &[]),
        Err(BearerError::EmptyMessage)
    ));
    assert!(matches!(
        provisioner.send(now, &payload(67)),
        Err(BearerError::MessageTooLarge { size: 67, max: 66 })
    ));
    assert!(provisioner.transport().sent().is_empty());
    assert!(drain_events(&mut provisioner).is_empty());

    // Neither attempt consumed a transaction id.
    assert_eq!(
        provisioner.send(now, &payload(66)).unwrap(),
        TransactionId::new(0x00)
    );
    assert_eq!(provisioner.transport().sent().len(), 3);
}

#[test]
fn ack_completes_exactly_once() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let link_id = provisioner.link_id().unwrap();
    let xact_id = provisioner.send(now, &payload(30)).unwrap();

    let ack = ack_frame(link_id, xact_id);
    provisioner.handle_frame(now, &ack);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::Acked
        }]
    );
    assert_eq!(provisioner.held_segments(), 0);
    assert_eq!(provisioner.outbound_xact_id(), None);
    assert_eq!(
        provisioner.next_deadline(),
        Some(now + Duration::from_secs(60))
    );

    provisioner.handle_frame(now, &ack);
    assert!(drain_events(&mut provisioner).is_empty());
}

#[test]
fn ack_for_other_transaction_ignored() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let link_id = provisioner.link_id().unwrap();
    let xact_id = provisioner.send(now, &payload(5)).unwrap();

    provisioner.handle_frame(now, &ack_frame(link_id, xact_id.next()));
    assert!(drain_events(&mut provisioner).is_empty());
    assert_eq!(provisioner.outbound_xact_id(), Some(xact_id));
}

#[test]
fn retransmit_skips_frames_still_queued() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    provisioner.send(now, &payload(50)).unwrap();

    let sent = provisioner.transport_mut().take_sent();
    assert_eq!(sent.len(), 3);
    provisioner.on_transmit_complete(sent[1].token, Ok(()));

    provisioner.handle_timeouts(now + Duration::from_millis(500));
    assert_eq!(
        take_described(&mut provisioner),
        vec![Sent::Cont { xact: 0, seg: 1 }]
    );
}

#[test]
fn transaction_times_out_exactly_once() {
    let start = Instant::now();
    let mut provisioner = active_provisioner(start);
    let xact_id = provisioner.send(start, &payload(40)).unwrap();

    let mut events = Vec::new();
    let mut now = start;
    while now <= start + Duration::from_secs(35) {
        complete_all(&mut provisioner);
        provisioner.handle_timeouts(now);
        events.extend(drain_events(&mut provisioner));
        now += Duration::from_millis(500);
    }

    assert_eq!(
        events,
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::TimedOut
        }]
    );
    assert_eq!(provisioner.held_segments(), 0);
    assert_eq!(provisioner.link_state(), LinkState::Active);
}

#[test]
fn new_send_cancels_previous() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let first = provisioner.send(now, &payload(5)).unwrap();
    let second = provisioner.send(now, &payload(5)).unwrap();
    assert_eq!(second, first.next());
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id: first,
            outcome: SendOutcome::Cancelled
        }]
    );
    assert_eq!(provisioner.outbound_xact_id(), Some(second));
}

#[test]
fn start_transmit_failure_is_returned() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    provisioner
        .transport_mut()
        .fail_next(TransportError::NoBuffers);
    assert!(matches!(
        provisioner.send(now, &payload(30)),
        Err(BearerError::Transport(TransportError::NoBuffers))
    ));
    assert_eq!(provisioner.held_segments(), 0);
    assert!(drain_events(&mut provisioner).is_empty());

    assert_eq!(
        provisioner.send(now, &payload(30)).unwrap(),
        TransactionId::new(0x00)
    );
}

#[test]
fn continuation_failure_retried_next_cycle() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    provisioner.transport_mut().pass_next();
    provisioner
        .transport_mut()
        .fail_next(TransportError::NoBuffers);

    provisioner.send(now, &payload(30)).unwrap();
    assert_eq!(
        take_described(&mut provisioner),
        vec![Sent::Start {
            xact: 0,
            total_len: 30
        }]
    );

    provisioner.handle_timeouts(now + Duration::from_millis(500));
    assert_eq!(
        take_described(&mut provisioner),
        vec![Sent::Cont { xact: 0, seg: 1 }]
    );
}

#[test]
fn clear_tx_cancels_without_peer_notice() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let xact_id = provisioner.send(now, &payload(5)).unwrap();
    provisioner.transport_mut().take_sent();

    provisioner.clear_tx();
    assert_eq!(
        drain_events(&mut provisioner),
        vec![BearerEvent::SendComplete {
            xact_id,
            outcome: SendOutcome::Cancelled
        }]
    );
    assert_eq!(provisioner.held_segments(), 0);
    assert!(provisioner.transport().sent().is_empty());
    assert_eq!(provisioner.link_state(), LinkState::Active);

    provisioner.clear_tx();
    assert!(drain_events(&mut provisioner).is_empty());
}

#[test]
fn close_cancels_in_flight_send() {
    let now = Instant::now();
    let mut provisioner = active_provisioner(now);
    let xact_id = provisioner.send(now, &payload(5)).unwrap();
    provisioner.transport_mut().take_sent();

    provisioner.close(now, CloseReason::Success);
    complete_all(&mut provisioner);
    assert_eq!(
        drain_events(&mut provisioner),
        vec![
            BearerEvent::SendComplete {
                xact_id,
                outcome: SendOutcome::Cancelled
            },
            BearerEvent::LinkClosed(CloseReason::Success),
        ]
    );
}

#[test]
fn peer_close_cancels_in_flight_send() {
    let now = Instant::now();
    let mut device = active_device(now);
    let xact_id = device.send(now, &payload(5)).unwrap();
    device.handle_frame(
        now,
        &control_frame(LINK, BearerControl::LinkClose(CloseReason::Fail)),
    );
    assert_eq!(
        drain_events(&mut device),
        vec![
            BearerEvent::SendComplete {
                xact_id,
                outcome: SendOutcome::Cancelled
            },
            BearerEvent::LinkClosed(CloseReason::Fail),
        ]
    );
}
