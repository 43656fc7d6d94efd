//! Benchmarks for the index-based `Arena<T>` allocator, against a plain
//! `Vec`-of-boxed-values baseline.
//!
//! Run with: `cargo bench --bench arena_benchmark`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reaper::arena::Arena;

#[derive(Clone)]
struct LinkRecord {
    url: String,
    nr_requests: u32,
}

fn bench_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_alloc");

    for size in [100usize, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("arena", size), size, |b, &size| {
            b.iter(|| {
                let arena: Arena<LinkRecord> = Arena::new(16);
                for i in 0..size {
                    black_box(arena.alloc(LinkRecord {
                        url: format!("http://t.test/{i}"),
                        nr_requests: 0,
                    }));
                }
                black_box(arena.nr_used())
            });
        });

        group.bench_with_input(BenchmarkId::new("vec", size), size, |b, &size| {
            b.iter(|| {
                let mut records = Vec::new();
                for i in 0..size {
                    records.push(black_box(LinkRecord {
                        url: format!("http://t.test/{i}"),
                        nr_requests: 0,
                    }));
                }
                black_box(records.len())
            });
        });
    }

    group.finish();
}

fn bench_alloc_dealloc_churn(c: &mut Criterion) {
    c.bench_function("arena_alloc_dealloc_churn", |b| {
        let arena: Arena<LinkRecord> = Arena::new(64);
        b.iter(|| {
            let mut idxs = Vec::with_capacity(256);
            for i in 0..256 {
                idxs.push(arena.alloc(LinkRecord {
                    url: format!("http://t.test/{i}"),
                    nr_requests: 0,
                }));
            }
            for idx in idxs {
                arena.dealloc(idx);
            }
            black_box(arena.nr_used())
        });
    });
}

fn bench_clear_all(c: &mut Criterion) {
    c.bench_function("arena_clear_all_between_generations", |b| {
        let arena: Arena<LinkRecord> = Arena::new(1024);
        for i in 0..1024 {
            arena.alloc(LinkRecord {
                url: format!("http://t.test/{i}"),
                nr_requests: 0,
            });
        }
        b.iter(|| {
            arena.clear_all();
            for i in 0..1024 {
                arena.alloc(LinkRecord {
                    url: format!("http://t.test/{i}"),
                    nr_requests: 0,
                });
            }
            black_box(arena.nr_used())
        });
    });
}

criterion_group!(benches, bench_alloc, bench_alloc_dealloc_churn, bench_clear_all);
criterion_main!(benches);
