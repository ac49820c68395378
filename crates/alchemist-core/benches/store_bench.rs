//! # Store Benchmarks
//!
//! Performance benchmarks for the per-iteration store operations: sampling
//! and the pair dedup check.
//!
//! Run with: `cargo bench -p alchemist-core`

use alchemist_core::{Element, ElementStore, MemoryStore, RedbStore};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

/// Fill a store with `size` elements and a combo between each neighbour pair.
fn populate(store: &mut impl ElementStore, size: usize) {
    for i in 0..size {
        let _ = store.insert_element(Element::new(format!("Element {i}")));
    }
    for i in 1..size {
        let _ = store.insert_combo(
            &format!("Element {}", i - 1),
            &format!("Element {i}"),
            &format!("Element {}", (i * 7) % size),
        );
    }
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_element");

    for size in [100, 1000, 10000].iter() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("bench.redb")).expect("open");
        populate(&mut store, *size);
        let mut rng = StdRng::seed_from_u64(0);

        group.bench_with_input(BenchmarkId::new("redb", size), size, |b, &size| {
            b.iter(|| black_box(store.sample_element(size as u64, &mut rng)));
        });
    }

    group.finish();
}

fn bench_combo_exists(c: &mut Criterion) {
    let mut group = c.benchmark_group("combo_exists");

    for size in [100, 1000, 10000].iter() {
        let mut memory = MemoryStore::new();
        populate(&mut memory, *size);
        let temp = tempfile::tempdir().expect("temp dir");
        let mut redb = RedbStore::open(temp.path().join("bench.redb")).expect("open");
        populate(&mut redb, *size);

        group.bench_with_input(BenchmarkId::new("memory", size), size, |b, _| {
            b.iter(|| black_box(memory.combo_exists("Element 1", "Element 0")));
        });
        group.bench_with_input(BenchmarkId::new("redb", size), size, |b, _| {
            b.iter(|| black_box(redb.combo_exists("Element 1", "Element 0")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sampling, bench_combo_exists);
criterion_main!(benches);
