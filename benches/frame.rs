use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;
use yabuild_rs::{
    config::RenderConfig,
    engine::Engine,
    renderer::{Backend, BackendKind},
    world::{Camera, TextureBank, demo},
};

fn criterion_benchmark(c: &mut Criterion) {
    let mut bank = TextureBank::default_with_checker();
    let world = demo::demo_level(&mut bank).unwrap();
    let camera = demo::demo_camera();

    for kind in [BackendKind::Software, BackendKind::Hardware] {
        let config = RenderConfig {
            backend: kind,
            ..Default::default()
        };
        let mut engine = Engine::new(Backend::new(kind, &config), config).unwrap();
        c.bench_function(&format!("demo frame 640x400 {kind:?}"), |b| {
            b.iter(|| {
                let stats =
                    engine.render_frame(&world, &camera, &mut bank, &mut (), |fb, _, _| {
                        black_box(fb);
                    });
                black_box(stats);
            })
        });
    }

    let ring = demo::ring_corridor().unwrap();
    let config = RenderConfig::default();
    let mut engine = Engine::new(Backend::new(BackendKind::Software, &config), config).unwrap();
    let camera = Camera::new(Vec3::new(64.0, 64.0, 64.0), 0.4, 90f32.to_radians());
    c.bench_function("ring corridor frame 640x400", |b| {
        b.iter(|| {
            black_box(engine.render_frame(&ring, &camera, &mut bank, &mut (), |_, _, _| {}));
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
