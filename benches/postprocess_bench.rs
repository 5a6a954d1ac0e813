use criterion::{black_box, criterion_group, criterion_main, Criterion};
use solid_pipeline::camera::DepthOffset;
use solid_pipeline::renderer::solid_pass::SolidGeometry;
use solid_pipeline::{Fragment, SoftwareTarget, SolidPipeline};

/// Grid of overlapping squares at staggered depths.
struct Tiles;

impl SolidGeometry for Tiles {
    fn rasterize(&self, target: &mut SoftwareTarget<'_>, _offset: &DepthOffset) {
        let extent = target.extent();
        for i in 0..64u32 {
            let x = (i % 8) * extent.width / 8;
            let y = (i / 8) * extent.height / 8;
            let _ = target.fill_rect(
                (x, y),
                (x + extent.width / 6, y + extent.height / 6),
                Fragment {
                    depth: 0.2 + (i % 5) as f32 * 0.1,
                    color: [0.7, 0.5, 0.3, 1.0],
                    normal: [0.0, 0.0, 1.0],
                },
            );
        }
    }
}

fn frame(pipeline: &mut SolidPipeline) {
    pipeline.begin().unwrap();
    pipeline.draw(&Tiles).unwrap();
    pipeline.end().unwrap();
}

fn chain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("software_frame");

    let mut pipeline = SolidPipeline::software();
    pipeline.resize(320, 240).unwrap();
    pipeline.initialize().unwrap();

    group.bench_function("composite_only", |b| {
        b.iter(|| frame(black_box(&mut pipeline)));
    });

    pipeline.set_ao_enabled(true);
    pipeline.set_dof_enabled(true);
    pipeline.set_ed_enabled(true);
    group.bench_function("all_effects", |b| {
        b.iter(|| frame(black_box(&mut pipeline)));
    });

    group.finish();
}

fn resize_benchmark(c: &mut Criterion) {
    let mut pipeline = SolidPipeline::software();
    pipeline.initialize().unwrap();
    let mut wide = false;
    c.bench_function("resize_640x480", |b| {
        b.iter(|| {
            wide = !wide;
            let width = if wide { 640 } else { 480 };
            pipeline.resize(black_box(width), black_box(480)).unwrap();
        });
    });
}

criterion_group!(benches, chain_benchmark, resize_benchmark);
criterion_main!(benches);
