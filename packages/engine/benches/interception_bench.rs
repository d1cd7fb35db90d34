// packages/engine/benches/interception_bench.rs
//! Dispatch and exchange benchmarks
//!
//! Run with: cargo bench --bench interception_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sentra_lab_swizzle::interception::ExchangeEngine;
use sentra_lab_swizzle::utils::config::ExchangeConfig;
use sentra_lab_swizzle::{Implementation, OperationLocator, TypeDescriptor, TypeRegistry};
use serde_json::json;
use std::sync::Arc;

/// Linear chain of `depth` types with `op` defined on the root
fn chain(depth: usize) -> (Arc<TypeRegistry>, TypeDescriptor, TypeDescriptor) {
    let registry = Arc::new(TypeRegistry::new());
    let root = registry.declare_type("T0", None).unwrap();
    registry
        .register_operation(root, "op", Implementation::new("v@:", |_| json!(0)))
        .unwrap();

    let mut leaf = root;
    for i in 1..depth {
        leaf = registry.declare_type(format!("T{}", i), Some(leaf)).unwrap();
    }

    (registry, root, leaf)
}

fn bench_invoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");

    for depth in [1, 4, 16] {
        let (registry, _, leaf) = chain(depth);
        group.bench_with_input(BenchmarkId::new("inherited", depth), &depth, |b, _| {
            b.iter(|| black_box(registry.invoke(leaf, "op", &[]).unwrap()));
        });
    }

    group.finish();
}

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");

    let (registry, root, leaf) = chain(4);
    registry
        .register_operation(root, "alt", Implementation::new("v@:", |_| json!(1)))
        .unwrap();
    let engine = ExchangeEngine::new(Arc::clone(&registry), ExchangeConfig::default());
    let original = OperationLocator::new(leaf, "op");
    let alternative = OperationLocator::new(leaf, "alt");

    group.bench_function("swap_own_entries", |b| {
        b.iter(|| black_box(engine.exchange(&original, &alternative)));
    });

    group.finish();
}

criterion_group!(benches, bench_invoke, bench_exchange);
criterion_main!(benches);
