use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use pipeline_vcast::{
    AvatarSurface, CaptureStream, CompositingService, Compositor, DomainError, ImageProvider,
    MetricsReporter, Result, SessionStatus, SourceService, SourceStore, StageLayout,
    TextRenderer,
};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Solid-colour images keyed by path
struct Palette(HashMap<PathBuf, Arc<RgbaImage>>);

impl Palette {
    fn new(entries: &[(&str, Rgba<u8>)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(path, color)| {
                    (PathBuf::from(path), Arc::new(RgbaImage::from_pixel(2, 2, *color)))
                })
                .collect(),
        )
    }
}

impl ImageProvider for Palette {
    fn image(&self, path: &Path) -> Option<Arc<RgbaImage>> {
        self.0.get(path).cloned()
    }
}

/// Renders every text box as an opaque white block
struct WhiteText;

impl TextRenderer for WhiteText {
    fn render(&self, content: &str, width: u32, height: u32) -> Result<RgbaImage> {
        if content.is_empty() {
            return Err(DomainError::TextRasterization("nothing to draw".to_string()));
        }
        Ok(RgbaImage::from_pixel(width, height, WHITE))
    }
}

#[derive(Default)]
struct CountingMetrics(std::sync::atomic::AtomicU64);

impl MetricsReporter for CountingMetrics {
    fn report_state_change(&self, _status: &SessionStatus) {}
    fn report_chunk_sent(&self, _bytes: usize) {}
    fn report_chunk_dropped(&self) {}
    fn report_frame_composited(&self) {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
    fn report_uptime(&self, _uptime_secs: f64) {}
}

fn palette() -> Arc<Palette> {
    Arc::new(Palette::new(&[("/a.png", RED), ("/b.png", GREEN), ("/c.png", BLUE)]))
}

fn mounted(width: u32, height: u32) -> Compositor {
    let mut compositor = Compositor::new(
        StageLayout::new(width, height).unwrap(),
        palette(),
        Arc::new(WhiteText),
    );
    compositor.mount();
    compositor
}

#[test]
fn test_later_sources_paint_on_top() {
    let mut store = SourceStore::new();
    store.add_image("/a.png", None, 40.0, 40.0);
    store.add_image("/b.png", None, 40.0, 40.0);
    store.add_image("/c.png", None, 40.0, 40.0);

    let mut compositor = mounted(160, 90);
    assert!(compositor.render_sources(store.sources()));

    let canvas = compositor.canvas().unwrap();
    assert_eq!(canvas.get_pixel(20, 20), &BLUE);
    // outside every source the stage stays transparent
    assert_eq!(canvas.get_pixel(100, 20), &Rgba([0, 0, 0, 0]));
}

#[test]
fn test_geometry_controls_placement_and_scaling() {
    let mut store = SourceStore::new();
    store.add_image("/a.png", None, 10.0, 10.0);
    let moved = store.sources()[0].with_geometry(
        store.sources()[0].geometry().moved_to(50.0, 30.0).resized_to(20.0, 10.0),
    );
    store.update(moved);

    let mut compositor = mounted(160, 90);
    compositor.render_sources(store.sources());

    let canvas = compositor.canvas().unwrap();
    assert_eq!(canvas.get_pixel(50, 30), &RED);
    assert_eq!(canvas.get_pixel(69, 39), &RED);
    assert_eq!(canvas.get_pixel(70, 30)[3], 0);
    assert_eq!(canvas.get_pixel(5, 5)[3], 0);
}

#[test]
fn test_unavailable_and_empty_sources_are_skipped() {
    let mut store = SourceStore::new();
    store.add_image("/missing.png", None, 40.0, 40.0);
    store.add_text("", 40.0, 40.0);
    store.add_image("/a.png", None, 0.0, 40.0);
    store.add_text("caption", 10.0, 10.0);

    let mut compositor = mounted(160, 90);
    assert!(compositor.render_sources(store.sources()));

    let canvas = compositor.canvas().unwrap();
    assert_eq!(canvas.get_pixel(8, 8), &WHITE);
    assert_eq!(canvas.get_pixel(30, 30)[3], 0);
}

#[test]
fn test_avatar_inset_is_bottom_right() {
    let mut compositor = mounted(1600, 900);
    let frame = Arc::new(RgbaImage::from_pixel(200, 300, GREEN));

    assert!(compositor.blit_avatar(frame));

    let canvas = compositor.canvas().unwrap();
    assert_eq!(canvas.get_pixel(1400, 600), &GREEN);
    assert_eq!(canvas.get_pixel(1599, 899), &GREEN);
    assert_eq!(canvas.get_pixel(1399, 600)[3], 0);
    assert_eq!(canvas.get_pixel(1400, 599)[3], 0);
}

#[test]
fn test_avatar_survives_source_repaint() {
    let mut store = SourceStore::new();
    store.add_image("/a.png", None, 2000.0, 1000.0);

    let mut compositor = mounted(1600, 900);
    compositor.blit_avatar(Arc::new(RgbaImage::from_pixel(200, 300, GREEN)));
    compositor.render_sources(store.sources());

    let canvas = compositor.canvas().unwrap();
    assert_eq!(canvas.get_pixel(1500, 800), &GREEN);
    assert_eq!(canvas.get_pixel(100, 100), &RED);
}

#[tokio::test]
async fn test_compositing_loop_feeds_capture_signal() {
    let compositor = mounted(160, 90);
    let signal = CaptureStream::acquire(&compositor, 30).unwrap();
    let metrics = Arc::new(CountingMetrics::default());

    let mut sources = SourceService::new();
    let avatar = AvatarSurface::new();
    let service = CompositingService::new(
        compositor,
        sources.subscribe(),
        avatar.subscribe(),
        metrics.clone(),
    );
    let task = tokio::spawn(service.run());

    sources.add_image("/c.png", None, 30.0, 30.0);
    avatar.present(RgbaImage::from_pixel(20, 10, GREEN));

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(frame) = signal.sample() {
                if frame.get_pixel(10, 10) == &BLUE && frame.get_pixel(150, 85) == &GREEN {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("merged frame published");

    drop(sources);
    drop(avatar);
    let compositor = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("loop exits once both producers are gone")
        .unwrap()
        .expect("compositor handed back");

    assert!(compositor.is_mounted());
    assert!(metrics.0.load(std::sync::atomic::Ordering::SeqCst) >= 2);
}
