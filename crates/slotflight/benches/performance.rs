// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Performance benchmarks for slotflight.
//!
//! Run with: cargo bench -p slotflight

#![allow(missing_docs, reason = "benchmark code")]

use criterion::{Criterion, criterion_group, criterion_main};
use slotflight::SingleSlot;

fn slot() -> SingleSlot<String> {
    SingleSlot::new(|| async { Ok::<_, String>("value".to_string()) }, String::new)
}

/// Fast path: the value is already cached.
fn bench_cached_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let slot = slot();
    rt.block_on(slot.get_or_await());

    c.bench_function("cached_hit", |b| {
        b.to_async(&rt).iter(|| slot.get_or_await());
    });
}

/// Miss path: a fresh slot per iteration with 100 concurrent callers coalescing on it.
fn bench_coalesced_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    c.bench_function("coalesced_miss_100", |b| {
        b.to_async(&rt).iter(|| async {
            let slot = slot();
            let tasks: Vec<_> = (0..100)
                .map(|_| {
                    let slot = slot.clone();
                    tokio::spawn(async move { slot.get_or_await().await })
                })
                .collect();

            for task in tasks {
                task.await.expect("Task panicked");
            }
        });
    });
}

/// Failure path: every call runs the producer and falls back.
fn bench_fallback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let slot = SingleSlot::new(|| async { Err::<String, _>("offline") }, String::new);

    c.bench_function("fallback", |b| {
        b.to_async(&rt).iter(|| slot.get_or_await());
    });
}

criterion_group!(benches, bench_cached_hit, bench_coalesced_miss, bench_fallback);
criterion_main!(benches);
