//! Safety classification benchmark.
//!
//! `classify` runs once per monitor tick and again on every reset request.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Instant;

use leak_common::safety::SafetyConfig;
use leak_control::safety::{SafetySnapshot, classify};

fn bench_classify(c: &mut Criterion) {
    let config = SafetyConfig::default();
    let healthy = SafetySnapshot::healthy(Instant::now());
    let warning = SafetySnapshot {
        pressure_bar: Some(4.7),
        tank_low: Some(true),
        ..healthy
    };

    c.bench_function("classify_healthy", |b| {
        b.iter(|| classify(black_box(&healthy), &config, black_box(true)))
    });
    c.bench_function("classify_warning", |b| {
        b.iter(|| classify(black_box(&warning), &config, black_box(false)))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
