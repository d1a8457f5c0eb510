use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dda_raycaster::lanes::cast_lanes;
use dda_raycaster::raycast::cast_column;
use dda_raycaster::render;
use dda_raycaster::{ColumnKernel, RenderConfig, Scene, Strategy};

fn bench_frames(c: &mut Criterion) {
    let scene = Scene::demo(66.0).expect("demo scene");
    let mut group = c.benchmark_group("frame_640x480");
    // Only the parallel strategy reads `kernel`.
    let variants = [
        ("scalar", Strategy::Scalar, None),
        ("vectorized", Strategy::Vectorized, None),
        ("parallel", Strategy::Parallel, Some(ColumnKernel::Scalar)),
        ("parallel_lanes", Strategy::Parallel, Some(ColumnKernel::Lanes)),
    ];
    for (name, strategy, kernel) in variants {
        let mut config = RenderConfig {
            strategy,
            ..RenderConfig::default()
        };
        if let Some(kernel) = kernel {
            config.kernel = kernel;
        }
        let mut renderer = render::build_cpu(&config).expect("renderer");
        group.bench_function(name, |b| {
            b.iter(|| {
                renderer.render_frame(black_box(&scene)).expect("frame");
            })
        });
    }
    group.finish();
}

fn bench_batch_size(c: &mut Criterion) {
    let scene = Scene::demo(66.0).expect("demo scene");
    let mut group = c.benchmark_group("parallel_batch_columns");
    for batch_columns in [1, 8, 32, 128] {
        let config = RenderConfig {
            strategy: Strategy::Parallel,
            batch_columns,
            ..RenderConfig::default()
        };
        let mut renderer = render::build_cpu(&config).expect("renderer");
        group.bench_with_input(BenchmarkId::from_parameter(batch_columns), &batch_columns, |b, _| {
            b.iter(|| {
                renderer.render_frame(black_box(&scene)).expect("frame");
            })
        });
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let scene = Scene::demo(66.0).expect("demo scene");
    c.bench_function("cast_column_x640", |b| {
        b.iter(|| {
            for column in 0..640 {
                black_box(cast_column(scene.grid(), scene.camera(), column, 640));
            }
        })
    });
    c.bench_function("cast_lanes_x80", |b| {
        b.iter(|| {
            for first in (0..640).step_by(8) {
                black_box(cast_lanes(scene.grid(), scene.camera(), first, 640));
            }
        })
    });
}

criterion_group!(benches, bench_frames, bench_batch_size, bench_traversal);
criterion_main!(benches);
