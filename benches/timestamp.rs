//! Criterion benchmarks for timestamp reconstruction.
//!
//! Finalization reconstructs and formats a timestamp for every frame in a
//! window (thousands of frames at high rates), so the per-frame cost sets
//! how long the producer stays stopped between windows.
//!
//! Run with: cargo bench --bench timestamp

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trigcap::clock::{Reconstructor, WallClock};

/// Reconstruct every timestamp of windows of increasing size.
fn reconstruct_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_window");

    // 200 fps capture windows from 0.5 s to 30 s of footage
    for frames in [100usize, 1_000, 6_000] {
        let recon = Reconstructor::new(WallClock::new(12, 0, 0, 0), frames / 2, 5_000);

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(BenchmarkId::new("positions", frames), &frames, |b, &n| {
            b.iter(|| {
                for pos in 0..n {
                    black_box(recon.timestamp_at(black_box(pos)));
                }
            });
        });
    }

    group.finish();
}

/// Format reconstructed timestamps into artifact names.
fn format_timestamps(c: &mut Criterion) {
    let recon = Reconstructor::new(WallClock::new(23, 59, 59, 995_000), 50, 5_000);

    c.bench_function("format_fixed_width", |b| {
        b.iter(|| {
            for pos in 0..100usize {
                black_box(recon.timestamp_at(pos).to_string());
            }
        });
    });
}

criterion_group!(benches, reconstruct_window, format_timestamps);
criterion_main!(benches);
