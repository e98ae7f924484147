//! Benchmarks for the AEDAT decoder and the windowed aggregator

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use navis_core::codec::aedat;
use navis_core::config::RecordingConfig;
use navis_core::generate::random_addresses;
use navis_core::{aggregate, SpikeStream};

const NUM_CHANNELS: u32 = 64;

/// Random stream at `events` spikes per second over one second
fn generate_stream(events: u64) -> SpikeStream {
    let mut rng = StdRng::seed_from_u64(42);
    let addresses = u64::from(NUM_CHANNELS) * 2;
    random_addresses(events, addresses, 1_000_000, &mut rng).unwrap_or_default()
}

fn bench_aedat_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("aedat_decode");
    let config = RecordingConfig::builder(NUM_CHANNELS).timestamp_tick(1.0).build().unwrap();

    for size in [10_000u64, 100_000, 1_000_000].iter() {
        let bytes = aedat::encode(&generate_stream(*size), &config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(aedat::decode(black_box(&bytes), config.address_size)));
        });
    }

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let config = RecordingConfig::new(NUM_CHANNELS, Default::default()).unwrap();

    for size in [10_000u64, 100_000, 1_000_000].iter() {
        let stream = generate_stream(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(aggregate(
                    black_box(&stream),
                    config.bin_size,
                    config.num_addresses(),
                    true,
                ))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aedat_decode, bench_aggregate);
criterion_main!(benches);
