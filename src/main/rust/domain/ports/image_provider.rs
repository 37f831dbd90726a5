use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::domain::errors::Result;

/// Port supplying decoded pixels for image sources
pub trait ImageProvider: Send + Sync {
    /// `None` when the image cannot be read; the source is then not drawn
    fn image(&self, path: &Path) -> Option<Arc<RgbaImage>>;

    /// Drop anything held for paths no longer on the stage
    fn release_unused(&self, _in_use: &[&Path]) {}
}

/// Port laying out text sources into a raster of exactly `width` x `height`
pub trait TextRenderer: Send + Sync {
    fn render(&self, content: &str, width: u32, height: u32) -> Result<RgbaImage>;
}
