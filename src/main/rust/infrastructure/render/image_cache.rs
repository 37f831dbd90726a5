use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;

use crate::domain::ports::ImageProvider;

/// Decodes image files on first use and keeps them for later repaints.
///
/// Failures are cached too, so an unreadable path is reported once.
#[derive(Default)]
pub struct FsImageCache {
    entries: Mutex<HashMap<PathBuf, Option<Arc<RgbaImage>>>>,
}

impl FsImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(path: &Path) -> Option<Arc<RgbaImage>> {
        match image::open(path) {
            Ok(img) => Some(Arc::new(img.to_rgba8())),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to decode image source: {}", e);
                None
            }
        }
    }
}

impl ImageProvider for FsImageCache {
    fn image(&self, path: &Path) -> Option<Arc<RgbaImage>> {
        let Ok(mut entries) = self.entries.lock() else {
            return Self::decode(path);
        };
        entries
            .entry(path.to_path_buf())
            .or_insert_with(|| Self::decode(path))
            .clone()
    }

    fn release_unused(&self, in_use: &[&Path]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|path, _| in_use.contains(&path.as_path()));
        }
    }
}
