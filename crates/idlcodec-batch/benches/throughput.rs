//! Batch decode throughput benchmarks.
//!
//! Measures Position account decode throughput at various batch sizes
//! using Criterion.
//!
//! # Running
//! ```bash
//! cargo bench --package idlcodec-batch
//! ```

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use idlcodec_batch::{BatchEngine, BatchRequest};
use idlcodec_borsh::BorshCodec;
use idlcodec_core::{
    decoder::ErrorMode, DecodedRecord, Matcher, Pubkey, RawRecord, RecordCategory, RecordCodec,
    SchemaRegistry, Value,
};
use idlcodec_registry::{perpetuals, MemoryRegistry};

// ─── Setup ────────────────────────────────────────────────────────────────────

fn make_registry() -> MemoryRegistry {
    perpetuals::registry().expect("bundled IDL loads")
}

fn make_position(codec: &BorshCodec, i: u64) -> Vec<u8> {
    // Vary owners and sizes so half the batch is open
    let owner = Pubkey::new([(i & 0xFF) as u8; 32]);
    let record = DecodedRecord::new("Position", RecordCategory::Account)
        .with("owner", owner)
        .with("pool", Pubkey::new([1; 32]))
        .with("custody", Pubkey::new([2; 32]))
        .with("collateralCustody", Pubkey::new([3; 32]))
        .with("openTime", 1_700_000_000 + i as i64)
        .with("updateTime", 1_700_000_000 + i as i64)
        .with("side", Value::unit_variant(if i % 2 == 0 { "Long" } else { "Short" }))
        .with("price", 150_000_000u64)
        .with("sizeUsd", (i % 2) * 1_000_000)
        .with("collateralUsd", 100_000u64)
        .with("realisedPnlUsd", -(i as i64))
        .with("cumulativeInterestSnapshot", u128::from(i) << 64)
        .with("lockedAmount", i)
        .with("bump", 255u8);
    codec.encode(&record).expect("position encodes")
}

fn make_batch(codec: &BorshCodec, n: usize) -> Vec<RawRecord> {
    (0..n as u64)
        .map(|i| RawRecord::account(make_position(codec, i)))
        .collect()
}

// ─── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_sequential_decode(c: &mut Criterion) {
    let codec = BorshCodec::new(Arc::new(make_registry()));

    let mut group = c.benchmark_group("sequential_decode");
    for batch_size in [100, 1_000, 10_000, 100_000] {
        let batch = make_batch(&codec, batch_size);
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch,
            |b, batch| {
                b.iter(|| {
                    for raw in batch {
                        let _ = codec.decode(&raw.data, "Position");
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_parallel_decode(c: &mut Criterion) {
    let codec = BorshCodec::new(Arc::new(make_registry()));
    let engine = BatchEngine::new(Arc::new(codec.clone()));

    let mut group = c.benchmark_group("parallel_decode_rayon");
    for batch_size in [1_000, 10_000, 100_000] {
        let batch = make_batch(&codec, batch_size);
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch,
            |b, batch| {
                b.iter(|| {
                    let req = BatchRequest::new(batch.clone()).error_mode(ErrorMode::Skip);
                    let _ = engine.decode(req);
                });
            },
        );
    }
    group.finish();
}

fn bench_discriminator_match(c: &mut Criterion) {
    let registry = make_registry();
    let codec = BorshCodec::new(Arc::new(registry.clone()));
    let data = make_position(&codec, 7);
    let matcher = Matcher::new(&registry);

    c.bench_function("matcher_matches_position", |b| {
        b.iter(|| matcher.matches(&data, "position"));
    });
}

fn bench_registry_lookup(c: &mut Criterion) {
    let registry = make_registry();
    let codec = BorshCodec::new(Arc::new(registry.clone()));
    let data = make_position(&codec, 7);

    c.bench_function("registry_schema_by_discriminator", |b| {
        b.iter(|| registry.schema_by_discriminator(RecordCategory::Account, &data));
    });
}

criterion_group!(
    benches,
    bench_sequential_decode,
    bench_parallel_decode,
    bench_discriminator_match,
    bench_registry_lookup,
);
criterion_main!(benches);
