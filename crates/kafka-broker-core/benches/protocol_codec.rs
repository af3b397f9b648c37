//! Performance benchmarks for the protocol primitives and metadata log scan.
//!
//! Measures varint coding and the byte-scanning resolver on logs of growing size.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kafka_broker_core::metadata::log_scan::{find_id_after, partition_indices_for};
use kafka_broker_core::protocol::primitives::{put_unsigned_varint, read_unsigned_varint};
use kafka_broker_core::testing::MetadataLogBuilder;

/// Benchmark unsigned varint encode and decode across byte widths.
fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("unsigned_varint");

    for value in [1u32, 300, 70_000, 10_000_000, u32::MAX] {
        let mut encoded = BytesMut::new();
        put_unsigned_varint(&mut encoded, value);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("encode", value), &value, |b, &v| {
            let mut buf = BytesMut::with_capacity(8);
            b.iter(|| {
                buf.clear();
                put_unsigned_varint(&mut buf, black_box(v));
            });
        });
        group.bench_with_input(BenchmarkId::new("decode", value), &encoded, |b, encoded| {
            b.iter(|| {
                let mut offset = 0;
                black_box(read_unsigned_varint(encoded, &mut offset).unwrap());
            });
        });
    }

    group.finish();
}

/// Build a metadata log with `topics` topics of 8 partitions each.
fn metadata_log(topics: usize) -> (Vec<u8>, String) {
    let mut builder = MetadataLogBuilder::new();
    let mut last = String::new();
    for i in 0..topics {
        last = format!("topic-{i:05}");
        builder = builder.topic(&last, &[0, 1, 2, 3, 4, 5, 6, 7]);
    }
    (builder.build().to_vec(), last)
}

/// Benchmark topic resolution by name against logs of growing size.
fn bench_log_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_log_scan");

    for topics in [10, 100, 1000] {
        let (log, name) = metadata_log(topics);
        let name_end = log
            .windows(name.len())
            .position(|w| w == name.as_bytes())
            .unwrap()
            + name.len();
        let id = find_id_after(&log, name_end).unwrap();

        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::new("find_id", topics), &log, |b, log| {
            b.iter(|| black_box(find_id_after(log, name_end)));
        });
        group.bench_with_input(BenchmarkId::new("partitions", topics), &log, |b, log| {
            b.iter(|| black_box(partition_indices_for(log, &id, 32)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_varint, bench_log_scan);
criterion_main!(benches);
