//! Benchmarks for the reorder adjuster
//!
//! Run with: cargo bench --package duelrank-reorder

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use duelrank_core::{ItemId, RankedItem, Rating};
use duelrank_reorder::ReorderAdjuster;

fn distinct_list(len: usize) -> Vec<RankedItem> {
    (0..len)
        .map(|i| {
            RankedItem::new(
                ItemId::new(format!("item{}", i)),
                Rating::with_score((len - i) as f64, 2.0),
            )
        })
        .collect()
}

fn tied_list(len: usize) -> Vec<RankedItem> {
    (0..len)
        .map(|i| RankedItem::new(ItemId::new(format!("item{:05}", i)), Rating::with_score(5.0, 2.0)))
        .collect()
}

fn bench_midpoint_move(c: &mut Criterion) {
    let adjuster = ReorderAdjuster::default();
    let items = distinct_list(5_000);
    let moved = ItemId::from("new");

    c.bench_function("plan_midpoint_5000", |b| {
        b.iter(|| {
            let plan = adjuster.plan(black_box(&items), &moved, Rating::default(), 2_500);
            black_box(plan);
        });
    });
}

fn bench_tie_break(c: &mut Criterion) {
    let adjuster = ReorderAdjuster::default();
    let moved = ItemId::from("new");
    let mut group = c.benchmark_group("plan_tie_break");

    for len in [10usize, 100, 1_000, 5_000] {
        let items = tied_list(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &items, |b, items| {
            b.iter(|| {
                let plan = adjuster.plan(black_box(items), &moved, Rating::default(), len / 2);
                black_box(plan);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_midpoint_move, bench_tie_break);
criterion_main!(benches);
