//! Envelope encoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use storesync_bench::{store_state, touch_one_section};
use storesync_diff::diff;
use storesync_protocol::{Envelope, SyncForClient};

fn full_sync(items: usize) -> Envelope {
    let state = store_state(8, items);
    let empty = storesync_value::Value::empty_object();
    Envelope::from(SyncForClient::init(diff(&empty, &state)))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for items in [10usize, 100, 1000] {
        let envelope = full_sync(items);
        let bytes = envelope.encode().unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("full_sync", items), &items, |b, _| {
            b.iter(|| black_box(black_box(&envelope).encode().unwrap()));
        });
    }

    let state = store_state(8, 100);
    let incremental = Envelope::from(SyncForClient::new(diff(&state, &touch_one_section(&state))));
    group.bench_function("incremental", |b| {
        b.iter(|| black_box(black_box(&incremental).encode().unwrap()));
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for items in [10usize, 100, 1000] {
        let bytes = full_sync(items).encode().unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("full_sync", items), &items, |b, _| {
            b.iter(|| black_box(Envelope::decode(black_box(&bytes)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
