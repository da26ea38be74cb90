//! Benchmarks for command merging and sorting against the mock device

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sprig_batch::{
    BatchConfig, BatchSortMode, Effect, GpuBindGroup, GpuRenderPipeline, PrimitiveBatch, PrimitiveType,
    TextureCommandData, VertexPositionColor,
};
use sprig_test_utils::MockGraphicsDevice;

const TEXTURE_COUNT: usize = 8;

fn quad(i: usize) -> [VertexPositionColor; 4] {
    let x = (i % 64) as f32;
    let y = (i / 64) as f32;
    [
        VertexPositionColor {
            position: [x, y, 0.0],
            color: [1.0; 4],
        },
        VertexPositionColor {
            position: [x + 1.0, y, 0.0],
            color: [1.0; 4],
        },
        VertexPositionColor {
            position: [x, y + 1.0, 0.0],
            color: [1.0; 4],
        },
        VertexPositionColor {
            position: [x + 1.0, y + 1.0, 0.0],
            color: [1.0; 4],
        },
    ]
}

fn bench_quads(c: &mut Criterion, name: &str, sort_mode: BatchSortMode, texture_runs: usize) {
    let mut group = c.benchmark_group(name);
    let textures: Vec<TextureCommandData> = (0..TEXTURE_COUNT)
        .map(|i| TextureCommandData::new(GpuBindGroup::mock(i)))
        .collect();
    let effect = Arc::new(Effect::single_pass("bench", GpuRenderPipeline::mock(0)));

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mock = Arc::new(MockGraphicsDevice::new());
            let mut batch =
                PrimitiveBatch::<VertexPositionColor, TextureCommandData>::new(mock.clone(), BatchConfig::default())
                    .unwrap();

            b.iter(|| {
                batch
                    .begin(effect.clone(), PrimitiveType::TriangleList, sort_mode)
                    .unwrap();
                for i in 0..size {
                    let texture = &textures[(i / texture_runs) % TEXTURE_COUNT];
                    batch
                        .draw_quad(black_box(quad(i)), (i % 4) as u32, texture.clone())
                        .unwrap();
                }
                batch.end().unwrap();
                mock.clear_calls();
            });
        });
    }

    group.finish();
}

fn bench_deferred_long_runs(c: &mut Criterion) {
    bench_quads(c, "deferred_long_runs", BatchSortMode::Deferred, 64);
}

fn bench_deferred_no_merges(c: &mut Criterion) {
    bench_quads(c, "deferred_no_merges", BatchSortMode::Deferred, 1);
}

fn bench_deferred_sorted(c: &mut Criterion) {
    bench_quads(c, "deferred_sorted", BatchSortMode::DeferredSorted, 1);
}

fn bench_immediate(c: &mut Criterion) {
    bench_quads(c, "immediate", BatchSortMode::Immediate, 64);
}

criterion_group!(
    benches,
    bench_deferred_long_runs,
    bench_deferred_no_merges,
    bench_deferred_sorted,
    bench_immediate
);
criterion_main!(benches);
