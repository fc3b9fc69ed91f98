//! Benchmark for loot rolls and save tokens.
//!
//! TARGET: 1,000,000 rolls per second
//!
//! Run with: cargo bench --package shisha_economy --bench loot_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shisha_economy::{LootTable, SaveToken, TierWeights};
use shisha_shared::LootTier;

fn benchmark_single_roll(c: &mut Criterion) {
    let table = LootTable::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    c.bench_function("single_loot_roll", |b| {
        b.iter(|| black_box(table.roll(&mut rng)));
    });
}

fn benchmark_million_rolls(c: &mut Criterion) {
    let table = LootTable {
        weights: TierWeights::new(50, 30, 20),
        ..LootTable::default()
    };

    let mut group = c.benchmark_group("million_rolls");
    group.throughput(Throughput::Elements(1_000_000));
    group.sample_size(10);

    group.bench_function("run_statistics", |b| {
        b.iter(|| black_box(table.run_statistics(black_box(42), 1_000_000)));
    });

    group.finish();
}

fn benchmark_save_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_tokens");
    group.throughput(Throughput::Elements(100));

    group.bench_function("encode_decode_100", |b| {
        b.iter(|| {
            for value in 0..100u32 {
                let tier = LootTier::ALL[(value % 3) as usize];
                if let Ok(token) = SaveToken::encode(black_box(tier), black_box(value)) {
                    black_box(token.decode()).ok();
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_roll,
    benchmark_million_rolls,
    benchmark_save_tokens
);
criterion_main!(benches);
