//! Integration tests for the render pipeline: dispenser, workers, surface,
//! ray stream.

use lumen_codec::convert::TGA_HEADER_SIZE;
use lumen_codec::{convert_to_tga, RayStreamReader, SampleCollector, StreamEnd};
use lumen_core::{
    render, Camera, ChannelObserver, CoreError, DispensePolicy, RenderSurface, Scene, ShadeError,
    UnitLayout, WorkDispenser,
};
use lumen_shared::{ColorF, Ray};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

fn temp_path(tag: &str, ext: &str) -> std::path::PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("lumen_pipeline_{tag}_{id}.{ext}"))
}

/// Colors each pixel by its ray direction so every pixel is distinct.
struct GradientScene;

impl Scene for GradientScene {
    fn shade(&self, ray: &Ray) -> Result<ColorF, ShadeError> {
        let d = ray.direction;
        Ok(ColorF::new(d.x * 0.5 + 0.5, d.y * 0.5 + 0.5, 0.25))
    }
}

/// Refuses every ray above the horizon.
struct HorizonScene;

impl Scene for HorizonScene {
    fn shade(&self, ray: &Ray) -> Result<ColorF, ShadeError> {
        if ray.direction.y > 0.0 {
            Err(ShadeError("sky not modelled".into()))
        } else {
            Ok(ColorF::WHITE)
        }
    }
}

fn dispenser(
    width: u32,
    height: u32,
    layout: UnitLayout,
    policy: DispensePolicy,
) -> Arc<WorkDispenser> {
    Arc::new(WorkDispenser::new(width, height, layout, policy).unwrap())
}

#[test]
fn test_streaming_render_round_trip() {
    let (width, height) = (37, 23);
    let path = temp_path("stream", "ray");

    let policy = DispensePolicy::Randomized { seed: 11 };
    let dispenser = dispenser(width, height, UnitLayout::Scanlines, policy);
    let surface =
        Arc::new(RenderSurface::streaming(&path, width, height, ColorF::BLACK).unwrap());
    let scene: Arc<dyn Scene> = Arc::new(GradientScene);
    let camera = Camera::default_for(width, height);

    let stats = render(&dispenser, &surface, &scene, camera, 6).unwrap();
    assert_eq!(stats.pixels, u64::from(width * height));
    assert_eq!(stats.skipped, 0);

    let mut reader = RayStreamReader::open(&path).unwrap();
    let mut sink = SampleCollector::default();
    let summary = reader.parse(&mut sink).unwrap();
    assert_eq!(summary.end, StreamEnd::EofRecord);
    assert_eq!(summary.pixels, u64::from(width * height));

    // Every coordinate exactly once, with the color the scene gave it
    let mut seen = HashSet::new();
    for sample in &sink.samples {
        assert!(seen.insert((sample.x, sample.y)));
        let expected = GradientScene.shade(&camera.primary_ray(sample.x, sample.y)).unwrap();
        assert_eq!(sample.rgb, expected.to_array());
    }
    assert_eq!(seen.len(), (width * height) as usize);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_span_layout_many_workers() {
    let (width, height) = (101, 57);
    let dispenser = dispenser(
        width,
        height,
        UnitLayout::Spans { span_width: 8 },
        DispensePolicy::Randomized { seed: 99 },
    );
    let surface = Arc::new(RenderSurface::in_memory(width, height, ColorF::BLACK).unwrap());
    let scene: Arc<dyn Scene> = Arc::new(GradientScene);

    let camera = Camera::default_for(width, height);
    let stats = render(&dispenser, &surface, &scene, camera, 16).unwrap();

    assert_eq!(stats.units, dispenser.total_units());
    assert_eq!(stats.pixels, u64::from(width * height));
    assert!(dispenser.is_exhausted());
    assert!(dispenser.request_unit().is_none());
}

#[test]
fn test_shade_failures_leave_background() {
    let (width, height) = (10, 10);
    let grey = ColorF::new(0.2, 0.2, 0.2);
    let dispenser = dispenser(width, height, UnitLayout::Scanlines, DispensePolicy::Sequential);
    let surface = Arc::new(RenderSurface::in_memory(width, height, grey).unwrap());
    let scene: Arc<dyn Scene> = Arc::new(HorizonScene);

    let camera = Camera::default_for(width, height);
    let stats = render(&dispenser, &surface, &scene, camera, 3).unwrap();

    // Top half is above the horizon
    assert_eq!(stats.skipped, 50);
    assert_eq!(stats.pixels, 50);
    assert_eq!(surface.read(5, 0).unwrap(), grey);
    assert_eq!(surface.read(5, 9).unwrap(), ColorF::WHITE);
}

#[test]
fn test_observer_receives_every_pixel() {
    let (width, height) = (32, 16);
    let dispenser = dispenser(width, height, UnitLayout::Scanlines, DispensePolicy::Sequential);
    let surface = Arc::new(RenderSurface::in_memory(width, height, ColorF::BLACK).unwrap());
    let (observer, events) = ChannelObserver::bounded((width * height) as usize);
    surface.set_notification(observer.clone());

    let scene: Arc<dyn Scene> = Arc::new(GradientScene);
    render(&dispenser, &surface, &scene, Camera::default_for(width, height), 4).unwrap();

    let received: HashSet<(u32, u32)> = events.try_iter().map(|e| (e.x, e.y)).collect();
    assert_eq!(received.len(), (width * height) as usize);
    assert_eq!(observer.dropped(), 0);
}

#[test]
fn test_tiny_observer_channel_never_blocks_render() {
    let (width, height) = (64, 64);
    let dispenser = dispenser(width, height, UnitLayout::Scanlines, DispensePolicy::Sequential);
    let surface = Arc::new(RenderSurface::in_memory(width, height, ColorF::BLACK).unwrap());
    let (observer, _events) = ChannelObserver::bounded(1);
    surface.set_notification(observer.clone());

    let scene: Arc<dyn Scene> = Arc::new(GradientScene);
    let start = Instant::now();
    let camera = Camera::default_for(width, height);
    let stats = render(&dispenser, &surface, &scene, camera, 4).unwrap();

    assert_eq!(stats.pixels, 64 * 64);
    assert_eq!(observer.dropped(), 64 * 64 - 1);
    assert!(start.elapsed().as_secs() < 30);
}

#[test]
fn test_zero_workers_starts_nothing() {
    let dispenser = dispenser(4, 4, UnitLayout::Scanlines, DispensePolicy::Sequential);
    let surface = Arc::new(RenderSurface::in_memory(4, 4, ColorF::BLACK).unwrap());
    let scene: Arc<dyn Scene> = Arc::new(GradientScene);

    let result = render(&dispenser, &surface, &scene, Camera::default_for(4, 4), 0);
    assert!(matches!(result, Err(CoreError::Configuration(_))));
    assert_eq!(dispenser.issued(), 0);
}

#[test]
fn test_streaming_render_converts_to_tga() {
    let (width, height) = (8, 4);
    let ray_path = temp_path("tga_src", "ray");
    let tga_path = temp_path("tga_out", "tga");

    let layout = UnitLayout::Spans { span_width: 3 };
    let dispenser = dispenser(width, height, layout, DispensePolicy::Randomized { seed: 5 });
    let surface =
        Arc::new(RenderSurface::streaming(&ray_path, width, height, ColorF::BLACK).unwrap());
    let scene: Arc<dyn Scene> = Arc::new(lumen_core::FlatScene(ColorF::new(1.0, 0.0, 0.0)));
    render(&dispenser, &surface, &scene, Camera::default_for(width, height), 2).unwrap();

    let mut reader = RayStreamReader::open(&ray_path).unwrap();
    convert_to_tga(&mut reader, &tga_path).unwrap();

    let header = TGA_HEADER_SIZE as usize;
    let bytes = std::fs::read(&tga_path).unwrap();
    assert_eq!(bytes.len(), header + (width * height * 3) as usize);
    // B, G, R
    assert_eq!(&bytes[header..header + 3], &[0, 0, 255]);

    std::fs::remove_file(&ray_path).ok();
    std::fs::remove_file(&tga_path).ok();
}
