use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tokio::sync::watch;

use crate::domain::entities::{Source, SourceId, SourceKind};
use crate::domain::ports::{ImageProvider, TextRenderer};
use crate::domain::value_objects::{StageFrame, StageLayout};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Raster of one source at its current pixel size
struct CachedLayer {
    kind: SourceKind,
    size: (u32, u32),
    decoded: Option<Arc<RgbaImage>>,
    pixels: RgbaImage,
}

impl CachedLayer {
    fn matches(
        &self,
        kind: &SourceKind,
        size: (u32, u32),
        decoded: Option<&Arc<RgbaImage>>,
    ) -> bool {
        let same_pixels = match (&self.decoded, decoded) {
            (Some(cached), Some(current)) => Arc::ptr_eq(cached, current),
            (None, None) => true,
            _ => false,
        };
        self.size == size && &self.kind == kind && same_pixels
    }
}

/// Owns the stage canvas and merges overlay sources with the avatar frame.
///
/// Every successful repaint publishes a copy of the canvas on the output
/// channel, which is what the capture stream samples. Repaints requested while
/// the stage is unmounted are dropped. Scaled and rasterized layers are kept
/// per source until its kind or size changes or it leaves the stage.
pub struct Compositor {
    layout: StageLayout,
    canvas: Option<RgbaImage>,
    avatar: Option<StageFrame>,
    layers: HashMap<SourceId, CachedLayer>,
    images: Arc<dyn ImageProvider>,
    text: Arc<dyn TextRenderer>,
    output: watch::Sender<Option<StageFrame>>,
}

impl Compositor {
    pub fn new(
        layout: StageLayout,
        images: Arc<dyn ImageProvider>,
        text: Arc<dyn TextRenderer>,
    ) -> Self {
        let (output, _) = watch::channel(None);
        Self {
            layout,
            canvas: None,
            avatar: None,
            layers: HashMap::new(),
            images,
            text,
            output,
        }
    }

    pub fn layout(&self) -> StageLayout {
        self.layout
    }

    pub fn is_mounted(&self) -> bool {
        self.canvas.is_some()
    }

    /// Allocate the stage canvas
    pub fn mount(&mut self) {
        if self.canvas.is_none() {
            self.canvas = Some(RgbaImage::new(self.layout.width(), self.layout.height()));
            tracing::debug!(
                width = self.layout.width(),
                height = self.layout.height(),
                "Stage mounted"
            );
        }
    }

    pub fn unmount(&mut self) {
        self.canvas = None;
        self.output.send_replace(None);
        tracing::debug!("Stage unmounted");
    }

    /// Recreate the canvas for a new stage size; the next repaint fills it
    pub fn relayout(&mut self, layout: StageLayout) {
        self.layout = layout;
        if self.canvas.is_some() {
            self.canvas = Some(RgbaImage::new(layout.width(), layout.height()));
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StageFrame>> {
        self.output.subscribe()
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Redraw every source in order (later ones on top), then the latest avatar frame.
    /// Returns `false` when the stage is not mounted.
    pub fn render_sources(&mut self, sources: &[Source]) -> bool {
        let Some(canvas) = self.canvas.as_mut() else {
            tracing::debug!("Stage not mounted, source repaint dropped");
            return false;
        };

        canvas.pixels_mut().for_each(|px| *px = TRANSPARENT);

        for source in sources {
            let Some(size) = source.geometry().pixel_size() else {
                continue;
            };
            let layer = Self::layer(
                &mut self.layers,
                self.images.as_ref(),
                self.text.as_ref(),
                source,
                size,
            );
            if let Some(layer) = layer {
                let (x, y) = source.geometry().pixel_origin();
                imageops::overlay(canvas, layer, x, y);
            }
        }

        self.layers.retain(|id, _| sources.iter().any(|source| source.id() == *id));
        let in_use: Vec<&Path> = sources
            .iter()
            .filter_map(|source| match source.kind() {
                SourceKind::Image { path } => Some(path.as_path()),
                SourceKind::Text { .. } => None,
            })
            .collect();
        self.images.release_unused(&in_use);

        if let Some(frame) = &self.avatar {
            Self::paint_avatar(canvas, &self.layout, frame);
        }

        self.publish();
        true
    }

    /// Replace the avatar inset with `frame`, leaving the rest of the stage untouched.
    /// Returns `false` when the stage is not mounted.
    pub fn blit_avatar(&mut self, frame: StageFrame) -> bool {
        self.avatar = Some(frame);

        let (Some(canvas), Some(frame)) = (self.canvas.as_mut(), self.avatar.as_ref()) else {
            tracing::trace!("Stage not mounted, avatar frame dropped");
            return false;
        };

        Self::paint_avatar(canvas, &self.layout, frame);
        self.publish();
        true
    }

    fn layer<'a>(
        layers: &'a mut HashMap<SourceId, CachedLayer>,
        images: &dyn ImageProvider,
        text: &dyn TextRenderer,
        source: &Source,
        size: (u32, u32),
    ) -> Option<&'a RgbaImage> {
        let decoded = match source.kind() {
            SourceKind::Image { path } => match images.image(path) {
                Some(img) => Some(img),
                None => {
                    layers.remove(&source.id());
                    return None;
                }
            },
            SourceKind::Text { .. } => None,
        };

        let fresh = layers
            .get(&source.id())
            .is_some_and(|cached| cached.matches(source.kind(), size, decoded.as_ref()));

        if !fresh {
            let (width, height) = size;
            let pixels = match (&decoded, source.kind()) {
                (Some(img), _) if img.dimensions() == size => (**img).clone(),
                (Some(img), _) => imageops::resize(&**img, width, height, FilterType::Triangle),
                (None, SourceKind::Text { content }) => match text.render(content, width, height) {
                    Ok(raster) => raster,
                    Err(e) => {
                        tracing::debug!(source_id = %source.id(), "Text layer skipped: {}", e);
                        layers.remove(&source.id());
                        return None;
                    }
                },
                (None, SourceKind::Image { .. }) => return None,
            };
            layers.insert(
                source.id(),
                CachedLayer {
                    kind: source.kind().clone(),
                    size,
                    decoded,
                    pixels,
                },
            );
        }

        layers.get(&source.id()).map(|cached| &cached.pixels)
    }

    // `replace` writes every inset pixel, alpha included, so it clears and draws in one pass.
    fn paint_avatar(canvas: &mut RgbaImage, layout: &StageLayout, frame: &RgbaImage) {
        let (x, y) = layout.avatar_origin(frame.width(), frame.height());
        imageops::replace(canvas, frame, x, y);
    }

    fn publish(&self) {
        if let Some(canvas) = &self.canvas {
            self.output.send_replace(Some(Arc::new(canvas.clone())));
        }
    }
}
