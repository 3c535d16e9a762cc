use std::time::Instant;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pbadv_core::{BearerControl, DeviceUuid, GenericProv, LinkId, Pdu, TransactionId};
use pbadv_protocol::testing::{MockTransport, drain_events, seeded_crypto};
use pbadv_protocol::transaction::tx::segment_message;
use pbadv_protocol::{BearerConfig, MeshCrypto, PbAdvBearer};
use rand::rngs::StdRng;

const UUID: DeviceUuid = DeviceUuid::new([0x11; 16]);
const LINK: LinkId = LinkId::new(0x1234_5678);

fn active_device() -> PbAdvBearer<MockTransport, MeshCrypto<StdRng>> {
    let mut device =
        PbAdvBearer::new(BearerConfig::default(), MockTransport::new(), seeded_crypto(7)).unwrap();
    device.accept(UUID).unwrap();
    let open = Pdu::new(
        LINK,
        TransactionId::new(0),
        GenericProv::Control(BearerControl::LinkOpen(UUID)),
    )
    .encode()
    .unwrap();
    device.handle_frame(Instant::now(), &open);
    drain_events(&mut device);
    device.transport_mut().take_sent();
    device
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for len in [16usize, 64, 256, 733] {
        let payload = vec![0x5Au8; len];
        let fcs = pbadv_crypto::fcs_calc(&payload);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("segment_message", len), &payload, |b, p| {
            b.iter(|| segment_message(LINK, TransactionId::new(0), p, fcs, 32).unwrap());
        });
    }

    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");

    for len in [16usize, 64, 256] {
        let payload = vec![0xA5u8; len];
        let fcs = pbadv_crypto::fcs_calc(&payload);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("device_rx", len), &payload, |b, p| {
            b.iter_batched(
                || {
                    let frames = segment_message(LINK, TransactionId::new(0), p, fcs, 32).unwrap();
                    (active_device(), frames)
                },
                |(mut device, frames)| {
                    let now = Instant::now();
                    for frame in &frames {
                        device.handle_frame(now, frame);
                    }
                    device.poll_event()
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_reassembly);
criterion_main!(benches);
