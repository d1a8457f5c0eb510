use dda_raycaster::framebuffer::pack_rgb;
use dda_raycaster::render::{self, ParallelRenderer, ScalarRenderer, VectorizedRenderer};
use dda_raycaster::{CameraState, ColumnKernel, FrameBuffer, MaterialPalette, RenderConfig, Renderer, Scene, Strategy, WorldGrid};
use glam::Vec2;

fn poses() -> Vec<CameraState> {
    vec![
        CameraState::from_yaw(Vec2::new(22.0, 12.0), std::f32::consts::PI, 66.0),
        CameraState::from_yaw(Vec2::new(12.25, 11.8), 0.4, 66.0),
        CameraState::from_yaw(Vec2::new(3.5, 3.5), 2.2, 90.0),
        CameraState::from_yaw(Vec2::new(18.9, 20.1), 4.0, 60.0),
        // Looking straight along an axis.
        CameraState::new(Vec2::new(12.0, 12.0), Vec2::NEG_Y, Vec2::X * 0.66),
    ]
}

fn scene_at(camera: CameraState) -> Scene {
    Scene::new(WorldGrid::default(), MaterialPalette::default(), camera).unwrap()
}

fn reference(scene: &Scene, width: usize, height: usize) -> FrameBuffer {
    ScalarRenderer::new(width, height, 0).render_frame(scene).unwrap().clone()
}

#[test]
fn vectorized_matches_scalar() {
    for (width, height) in [(320, 240), (123, 77), (7, 5)] {
        let mut lanes = VectorizedRenderer::new(width, height, 0);
        for camera in poses() {
            let scene = scene_at(camera);
            let expected = reference(&scene, width, height);
            assert_eq!(lanes.render_frame(&scene).unwrap(), &expected, "{width}x{height} {camera:?}");
        }
    }
}

#[test]
fn parallel_matches_scalar_for_any_batching() {
    for kernel in [ColumnKernel::Scalar, ColumnKernel::Lanes] {
        for (threads, batch_columns) in [(1, 1), (2, 7), (4, 32), (3, 1000)] {
            let config = RenderConfig {
                strategy: Strategy::Parallel,
                kernel,
                width: 203,
                height: 150,
                threads: Some(threads),
                batch_columns,
                ..RenderConfig::default()
            };
            let mut parallel = ParallelRenderer::new(&config).unwrap();
            for camera in poses() {
                let scene = scene_at(camera);
                let expected = reference(&scene, 203, 150);
                assert_eq!(
                    parallel.render_frame(&scene).unwrap(),
                    &expected,
                    "{kernel:?} threads={threads} batch={batch_columns}"
                );
            }
        }
    }
}

#[test]
fn ring_room_draws_a_centered_band() {
    let scene = Scene::new(
        WorldGrid::ring(24, 24, 1).unwrap(),
        MaterialPalette::default(),
        CameraState::new(Vec2::new(12.0, 12.0), Vec2::X, Vec2::Y),
    )
    .unwrap();
    let wall = pack_rgb(0, 0, 128);

    for strategy in [Strategy::Scalar, Strategy::Vectorized, Strategy::Parallel] {
        let config = RenderConfig {
            strategy,
            width: 320,
            height: 240,
            threads: Some(2),
            ..RenderConfig::default()
        };
        let mut renderer = render::build_cpu(&config).unwrap();
        let frame = renderer.render_frame(&scene).unwrap();
        for column in 0..320 {
            // Column 0 looks exactly along the diagonal and lands on a Y face.
            let color = if column == 0 { wall >> 1 } else { wall };
            for row in 0..240 {
                let expected = if (110..=130).contains(&row) { color } else { 0 };
                assert_eq!(frame.pixel(column, row), expected, "{strategy} ({column}, {row})");
            }
        }
    }
}

#[test]
fn camera_inside_wall_fills_every_column() {
    let scene = Scene::new(
        WorldGrid::ring(16, 16, 3).unwrap(),
        MaterialPalette::default(),
        CameraState::new(Vec2::new(0.5, 8.5), Vec2::X, Vec2::Y * 0.66),
    )
    .unwrap();
    let teal = pack_rgb(0, 128, 128);
    let shaded = pack_rgb(0, 64, 64);
    let frame = reference(&scene, 64, 48);
    for column in 0..64 {
        let top = frame.pixel(column, 0);
        assert!(top == teal || top == shaded, "column {column}: {top:#08x}");
        for row in 0..48 {
            assert_eq!(frame.pixel(column, row), top);
        }
    }
}

#[test]
fn map_edits_show_up_next_frame() {
    let mut scene = Scene::new(
        WorldGrid::ring(24, 24, 1).unwrap(),
        MaterialPalette::default(),
        CameraState::new(Vec2::new(12.0, 12.5), Vec2::X, Vec2::Y * 0.66),
    )
    .unwrap();
    let mut renderer = ScalarRenderer::new(64, 48, 0);
    let before = renderer.render_frame(&scene).unwrap().clone();

    scene.set_cell(14, 12, 4).unwrap();
    let after = renderer.render_frame(&scene).unwrap();
    assert_ne!(&before, after);
    // The new block is nearer, so the middle stripe is taller and maroon.
    assert_eq!(after.pixel(32, 24), pack_rgb(128, 0, 0));
    assert_ne!(after.pixel(32, 13), 0);
    assert_eq!(before.pixel(32, 13), 0);
}

#[test]
fn device_strategy_is_not_a_cpu_renderer() {
    let config = RenderConfig {
        strategy: Strategy::Device,
        ..RenderConfig::default()
    };
    assert!(render::build_cpu(&config).is_err());
}
