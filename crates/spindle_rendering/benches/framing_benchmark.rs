//! Benchmarks for the automatic view-framing pass.
//!
//! Tracking runs every frame over every filament point, so it has to
//! stay cheap even for crowded scenes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spindle_rendering::framing::auto_track;
use spindle_rendering::interop::FilamentInfo;
use spindle_rendering::view::{TrackFlags, View};
use spindle_shared::Vec3;

fn crowded_scene(filaments: usize, points: usize) -> Vec<FilamentInfo> {
    (0..filaments)
        .map(|f| {
            #[allow(clippy::cast_precision_loss)]
            let base = Vec3::new(f as f32 * 0.1, (f % 17) as f32 * 0.2, 0.0);
            FilamentInfo {
                points: (0..points)
                    .map(|p| {
                        #[allow(clippy::cast_precision_loss)]
                        let t = p as f32 * 0.05;
                        base + Vec3::new(t, (t * 3.0).sin() * 0.2, 0.0)
                    })
                    .collect(),
            }
        })
        .collect()
}

fn bench_auto_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_track");

    for &count in &[100_usize, 1000] {
        let scene = crowded_scene(count, 16);

        group.bench_with_input(BenchmarkId::new("center", count), &scene, |b, scene| {
            let mut view = View::new(800, 600);
            view.track = TrackFlags::CENTER;
            b.iter(|| auto_track(black_box(scene), &mut view));
        });

        group.bench_with_input(BenchmarkId::new("nematic", count), &scene, |b, scene| {
            let mut view = View::new(800, 600);
            view.track = TrackFlags::NEMATIC;
            b.iter(|| auto_track(black_box(scene), &mut view));
        });

        group.bench_with_input(
            BenchmarkId::new("center_moment", count),
            &scene,
            |b, scene| {
                let mut view = View::new(800, 600);
                view.track = TrackFlags::CENTER | TrackFlags::MOMENT;
                b.iter(|| auto_track(black_box(scene), &mut view));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_auto_track);
criterion_main!(benches);
