//! Throughput benchmark for the audio callback's hot path.

use criterion::{criterion_group, criterion_main, Criterion};
use dubsiren::Engine;
use std::hint::black_box;

fn bench_process(c: &mut Criterion) {
    let mut engine = Engine::with_defaults(48_000.0, 256);
    engine.set_volume(0.7);
    engine.set_frequency(110.0);
    engine.trigger();
    let mut out = vec![0.0f32; 256 * 2];

    c.bench_function("engine_process_256_frames", |b| {
        b.iter(|| {
            engine.process(black_box(&mut out));
            black_box(&out);
        })
    });
}

criterion_group!(benches, bench_process);
criterion_main!(benches);
