//! Benchmarks for in-place array edits and dotted-path access.
//!
//! Run with: cargo bench -p formstate-doc -- array

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use formstate_doc::{JsonStore, Path, Store, access, array};
use serde_json::json;

fn bench_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("array/move");
    for &len in &[100usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("first_to_last", len), &len, |b, &len| {
            let mut items: Vec<u64> = (0..len as u64).collect();
            b.iter(|| {
                array::move_item(black_box(&mut items), 0, len - 1);
            });
        });
    }
    group.finish();
}

fn bench_store_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("array/store_insert");
    for &len in &[100usize, 10_000] {
        group.bench_with_input(BenchmarkId::new("middle", len), &len, |b, &len| {
            let rows: Vec<_> = (0..len).map(|i| json!({ "id": i })).collect();
            let path = Path::parse("rows");
            b.iter_batched(
                || JsonStore::new(json!({ "rows": rows.clone() })),
                |mut store| {
                    store.array_insert(&path, len / 2, json!({ "id": -1 }));
                    store
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_path_access(c: &mut Criterion) {
    let doc = json!({ "a": { "b": [ { "c": { "d": [1, 2, 3] } } ] } });
    let path = Path::parse("a.b.0.c.d.2");
    c.bench_function("path/get_depth_6", |b| {
        b.iter(|| access::get(black_box(&doc), black_box(&path)));
    });
    c.bench_function("path/parse_depth_6", |b| {
        b.iter(|| Path::parse(black_box("a.b.0.c.d.2")));
    });
}

criterion_group!(benches, bench_move, bench_store_insert, bench_path_access);
criterion_main!(benches);
