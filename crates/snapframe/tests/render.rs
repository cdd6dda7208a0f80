//! End-to-end rendering on a real device.
//!
//! Every test needs a GPU adapter (a software one is fine). Machines without
//! any adapter skip these tests with a message instead of failing.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use snapframe::prelude::*;
use snapframe::render3d::scene::CUBE_FLAT_COLOR;

const MAGENTA: [u8; 3] = [255, 0, 255];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn gpu() -> Option<GpuContext> {
    init_logging();
    match GpuContext::headless(&RenderConfig::default()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping: no GPU adapter available ({err})");
            None
        }
    }
}

fn service() -> Option<RenderService> {
    init_logging();
    match RenderService::start(RenderConfig::default(), SceneAssets::builtin()) {
        Ok(service) => Some(service),
        Err(StartupError::Context(err)) => {
            eprintln!("skipping: no GPU adapter available ({err})");
            None
        }
        Err(err) => panic!("service failed to start: {err}"),
    }
}

fn renderer(gpu: &GpuContext) -> Renderer {
    let config = RenderConfig::default();
    let program = Program::compile(
        gpu,
        snapframe::shader::SCENE_VERTEX_SHADER,
        snapframe::shader::SCENE_FRAGMENT_SHADER,
    )
    .unwrap();
    let scene = Scene::default_scene(gpu, &program, &SceneAssets::builtin()).unwrap();
    Renderer::new(gpu, program, scene, &config).unwrap()
}

fn camera(request: &RenderRequest) -> CameraMatrices {
    CameraMatrices::compute(request, &Projection::default()).unwrap()
}

fn render(gpu: &GpuContext, renderer: &mut Renderer, request: &RenderRequest) -> RawFrame {
    renderer
        .render(gpu, &camera(request), request.width, request.height)
        .unwrap()
}

fn pixel_at(frame: &RawFrame, at: Vec2) -> [u8; 3] {
    frame.pixel(at.x as u32, at.y as u32).unwrap()
}

fn assert_close(actual: [u8; 3], expected: [u8; 3], tolerance: u8) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= tolerance,
            "pixel {actual:?} is not within {tolerance} of {expected:?}"
        );
    }
}

/// Screen position of the triangle's centroid for `request`.
fn triangle_centroid(request: &RenderRequest) -> Vec2 {
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0));
    camera(request)
        .project(Vec3::new(0.0, -1.0 / 3.0, 0.0), model, request.width, request.height)
        .unwrap()
}

#[test]
fn png_has_requested_dimensions() {
    let Some(service) = service() else { return };
    for (width, height) in [(800, 600), (1, 1), (333, 77)] {
        let png = service
            .render(RenderRequest {
                width,
                height,
                ..Default::default()
            })
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (width, height));
        assert_eq!(img.color(), image::ColorType::Rgb8);
    }
}

#[test]
fn identical_requests_produce_identical_bytes() {
    let Some(service) = service() else { return };
    let request = RenderRequest {
        x: 0.2,
        ry: 0.3,
        ..Default::default()
    };
    let first = service.render(request).unwrap();
    let second = service.render(request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn out_of_range_sizes_are_rejected() {
    let Some(service) = service() else { return };
    for (width, height) in [(0, 600), (800, 0), (4097, 600), (800, 4097)] {
        let err = service
            .render(RenderRequest {
                width,
                height,
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestValidation);
    }
    let err = service
        .render(RenderRequest {
            rx: f32::NAN,
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestValidation);
    // The render thread is unaffected.
    assert!(service.render(RenderRequest::default()).is_ok());
    assert_eq!(service.stats().failures, 5);
}

#[test]
fn frame_above_device_limit_fails_without_stopping_the_service() {
    init_logging();
    let config = RenderConfig {
        texture_size_limit: Some(256),
        ..RenderConfig::default()
    };
    let service = match RenderService::start(config, SceneAssets::builtin()) {
        Ok(service) => service,
        Err(StartupError::Context(err)) => {
            eprintln!("skipping: no GPU adapter available ({err})");
            return;
        }
        Err(err) => panic!("service failed to start: {err}"),
    };
    // Within the accepted request range, so validation lets it through.
    assert_eq!(service.max_dimension(), 4096);
    let err = service
        .render(RenderRequest {
            width: 300,
            height: 100,
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RenderFailure);
    assert!(matches!(
        err,
        RenderError::Frame(snapframe::render::FrameError::UnsupportedSize { max: 256, .. })
    ));

    let png = service
        .render(RenderRequest {
            width: 200,
            height: 100,
            ..Default::default()
        })
        .unwrap();
    let img = image::load_from_memory(&png).unwrap();
    assert_eq!((img.width(), img.height()), (200, 100));
    let stats = service.stats();
    assert_eq!((stats.frames_rendered, stats.failures), (1, 1));
}

#[test]
fn oversized_frame_target_is_a_render_failure() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let width = gpu.max_dimension() + 1;
    let request = RenderRequest {
        width,
        height: 1,
        ..Default::default()
    };
    let err = renderer
        .draw(&gpu, &camera(&request), width, 1)
        .err()
        .unwrap();
    assert!(matches!(err, snapframe::render::FrameError::UnsupportedSize { .. }));
}

#[test]
fn identity_pose_shows_triangle_blend_at_centroid() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let request = RenderRequest::default();
    let frame = render(&gpu, &mut renderer, &request);
    // Equal parts red, green and blue.
    assert_close(pixel_at(&frame, triangle_centroid(&request)), [85, 85, 85], 12);
}

#[test]
fn moving_closer_keeps_centroid_color() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let far = RenderRequest::default();
    let near = RenderRequest {
        z: 0.5,
        ..Default::default()
    };
    let far_color = pixel_at(&render(&gpu, &mut renderer, &far), triangle_centroid(&far));
    let near_color = pixel_at(&render(&gpu, &mut renderer, &near), triangle_centroid(&near));
    assert_close(near_color, far_color, 6);
}

#[test]
fn triangle_stays_in_front_of_cube_drawn_after_it() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let frame = render(&gpu, &mut renderer, &RenderRequest::default());
    // Screen center hits the triangle at (0, 0): a quarter red, a quarter
    // green, half blue. The cube behind it must not show through.
    assert_close(frame.pixel(400, 300).unwrap(), [64, 64, 128], 12);
}

#[test]
fn camera_between_triangle_and_cube_sees_only_cube() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let request = RenderRequest {
        z: -1.5,
        ..Default::default()
    };
    let frame = render(&gpu, &mut renderer, &request);
    for (x, y) in [(0, 0), (400, 300), (799, 599), (100, 500)] {
        let [r, g, b] = frame.pixel(x, y).unwrap();
        assert!(r == g && g == b, "expected a checker grey at ({x}, {y}), got {r},{g},{b}");
        assert!(r == 255 || r == 64, "expected a checker grey at ({x}, {y}), got {r}");
    }
}

#[test]
fn rotation_is_about_the_camera_position() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    // Stand between triangle and cube and turn around to face the triangle.
    let request = RenderRequest {
        z: -1.5,
        ry: std::f32::consts::PI,
        ..Default::default()
    };
    let frame = render(&gpu, &mut renderer, &request);
    assert_close(frame.pixel(400, 300).unwrap(), [64, 64, 128], 12);
}

#[test]
fn texture_flag_toggles_cube_sampling() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    let request = RenderRequest::default();
    // Point on the cube's front face, outside the triangle's silhouette.
    let on_cube = camera(&request)
        .project(Vec3::new(-0.8, 0.8, -2.0), Mat4::IDENTITY, 800, 600)
        .unwrap();

    let textured = pixel_at(&render(&gpu, &mut renderer, &request), on_cube);
    assert_ne!(textured, MAGENTA);
    assert!(textured[0] == textured[1] && textured[1] == textured[2]);

    renderer.set_textured("cube", false).unwrap();
    let flat = pixel_at(&render(&gpu, &mut renderer, &request), on_cube);
    let expected = CUBE_FLAT_COLOR.map(|c| (c * 255.0) as u8);
    assert_eq!(flat, expected);

    renderer.set_textured("cube", true).unwrap();
    let again = pixel_at(&render(&gpu, &mut renderer, &request), on_cube);
    assert_eq!(again, textured);
}

#[test]
fn texturing_an_untextured_entry_fails() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = renderer(&gpu);
    assert!(matches!(
        renderer.set_textured("triangle", true),
        Err(snapframe::render3d::SceneError::MissingTexture(_))
    ));
    assert!(matches!(
        renderer.set_textured("sphere", false),
        Err(snapframe::render3d::SceneError::UnknownEntry(_))
    ));
}

#[test]
fn concurrent_requests_are_all_served() {
    let Some(service) = service() else { return };
    let service = Arc::new(service);
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                let request = RenderRequest {
                    x: i as f32 * 0.1,
                    width: 64 + i * 16,
                    height: 48,
                    ..Default::default()
                };
                let png = service.render(request).unwrap();
                let img = image::load_from_memory(&png).unwrap();
                assert_eq!((img.width(), img.height()), (64 + i * 16, 48));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(service.stats().frames_rendered, 4);
    assert_eq!(service.stats().failures, 0);
}
