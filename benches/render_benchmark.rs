use criterion::{black_box, criterion_group, criterion_main, Criterion};
use storyframe::config::FrameFormat;
use storyframe::renderer::svg;
use storyframe::script::{CharacterPlacement, Expression, Position};
use storyframe::{CharacterCatalog, Compositor, CpuRasterizer, Rasterizer, RenderSettings, Scene};

fn create_test_scene() -> Scene {
    let mut scene = Scene::new("bench");
    scene.background_type = "castle".into();
    scene.narration = "The hero and the friend walked toward the castle gates together.".into();
    scene.characters = vec![
        CharacterPlacement::new("hero", Position::new(0.3, 0.7), Expression::Happy),
        CharacterPlacement::new("friend", Position::new(0.7, 0.7), Expression::Surprised),
    ];
    scene
}

fn bench_compose_frame(c: &mut Criterion) {
    let scene = create_test_scene();
    let catalog = CharacterCatalog::builtin();
    let compositor = Compositor::new(RenderSettings::default());

    c.bench_function("compose_frame_720p", |b| {
        b.iter(|| compositor.render(black_box(&scene), &catalog, black_box(42)))
    });
}

fn bench_rasterize_frame(c: &mut Criterion) {
    let scene = create_test_scene();
    let catalog = CharacterCatalog::builtin();
    let settings = RenderSettings {
        width: 640,
        height: 360,
        ..RenderSettings::default()
    };
    let visual = Compositor::new(settings).render(&scene, &catalog, 42);
    let rasterizer = CpuRasterizer::new();

    c.bench_function("rasterize_frame_360p", |b| {
        b.iter(|| rasterizer.rasterize(black_box(&visual)).unwrap())
    });

    let buffer = rasterizer.rasterize(&visual).unwrap();
    c.bench_function("encode_png_360p", |b| {
        b.iter(|| buffer.encode(black_box(FrameFormat::Png)).unwrap())
    });
}

fn bench_svg(c: &mut Criterion) {
    let visual = Compositor::new(RenderSettings::default()).render(
        &create_test_scene(),
        &CharacterCatalog::builtin(),
        42,
    );

    c.bench_function("frame_to_svg", |b| b.iter(|| svg::to_svg(black_box(&visual))));
}

criterion_group!(benches, bench_compose_frame, bench_rasterize_frame, bench_svg);
criterion_main!(benches);
