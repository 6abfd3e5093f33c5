//! Benchmarks for the VerusHash v2/2.1/2.2 block hash pipeline.
//!
//! Criterion benches only see `verushash-core`'s public surface, so the per-variant
//! groups below select a variant the same way a real caller would: by setting the
//! solution's own version field and letting `compute_block_hash` dispatch internally.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use verushash_core::{compute_block_hash, BlockHeader, Solution, SOLUTION_SIZE, SOLUTION_VERUSV5, VERUS_V2};

fn header_with_solution_version(version: u32) -> BlockHeader {
    let mut solution = vec![0u8; SOLUTION_SIZE];
    Solution::new(&mut solution).set_version(version);

    BlockHeader {
        version: VERUS_V2,
        prev_block: [0x11; 32],
        merkle_root: [0x22; 32],
        final_sapling_root: [0x33; 32],
        time: 1_600_000_000,
        bits: 0x1e7fffff,
        nonce: [0x44; 32],
        solution,
    }
}

fn bench_v1(c: &mut Criterion) {
    let header = header_with_solution_version(SOLUTION_VERUSV5 - 1);
    c.bench_function("compute_block_hash/v1", |b| {
        b.iter(|| compute_block_hash(black_box(&header)))
    });
}

fn bench_sv2_2(c: &mut Criterion) {
    let header = header_with_solution_version(SOLUTION_VERUSV5);
    c.bench_function("compute_block_hash/sv2_2", |b| {
        b.iter(|| compute_block_hash(black_box(&header)))
    });
}

fn bench_varying_nonce(c: &mut Criterion) {
    let mut header = header_with_solution_version(SOLUTION_VERUSV5);

    c.bench_function("compute_block_hash/varying_nonce", |b| {
        let mut counter: u64 = 0;
        b.iter(|| {
            header.nonce[0..8].copy_from_slice(&counter.to_le_bytes());
            counter = counter.wrapping_add(1);
            compute_block_hash(black_box(&header))
        })
    });
}

criterion_group!(benches, bench_v1, bench_sv2_2, bench_varying_nonce);
criterion_main!(benches);
