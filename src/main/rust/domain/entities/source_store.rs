use std::path::PathBuf;

use super::source::{Source, SourceId};

/// Ordered collection of overlay sources.
///
/// Insertion order is paint order: later sources are drawn on top. There is
/// no separate z field. None of the operations fail; unknown ids are ignored.
#[derive(Debug, Clone, Default)]
pub struct SourceStore {
    sources: Vec<Source>,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(
        &mut self,
        path: impl Into<PathBuf>,
        name: Option<String>,
        width: f64,
        height: f64,
    ) {
        self.push(Source::image(path, name, width, height));
    }

    pub fn add_text(&mut self, content: impl Into<String>, width: f64, height: f64) {
        self.push(Source::text(content, width, height));
    }

    /// Replace the stored source carrying the same id
    pub fn update(&mut self, entity: Source) {
        match self.sources.iter_mut().find(|s| s.id() == entity.id()) {
            Some(slot) => *slot = entity,
            None => tracing::debug!(source_id = %entity.id(), "Update for unknown source ignored"),
        }
    }

    pub fn remove(&mut self, id: SourceId) {
        let before = self.sources.len();
        self.sources.retain(|s| s.id() != id);
        if self.sources.len() == before {
            tracing::debug!(source_id = %id, "Remove for unknown source ignored");
        }
    }

    pub fn list_images(&self) -> impl Iterator<Item = &Source> + '_ {
        self.sources.iter().filter(|s| s.is_image())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn push(&mut self, source: Source) {
        tracing::debug!(source_id = %source.id(), name = %source.name(), "Source added");
        self.sources.push(source);
    }
}
