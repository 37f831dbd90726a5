use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::entities::{Source, SourceId, SourceStore};

/// Application service owning the overlay store.
///
/// Every mutation publishes an immutable snapshot that the compositing loop
/// repaints from; readers never see a half-applied change.
pub struct SourceService {
    store: SourceStore,
    snapshots: watch::Sender<Arc<[Source]>>,
}

impl SourceService {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Arc::from(Vec::new()));
        Self {
            store: SourceStore::new(),
            snapshots,
        }
    }

    pub fn add_image(
        &mut self,
        path: impl Into<PathBuf>,
        name: Option<String>,
        width: f64,
        height: f64,
    ) {
        self.store.add_image(path, name, width, height);
        self.publish();
    }

    pub fn add_text(&mut self, content: impl Into<String>, width: f64, height: f64) {
        self.store.add_text(content, width, height);
        self.publish();
    }

    pub fn update(&mut self, entity: Source) {
        self.store.update(entity);
        self.publish();
    }

    pub fn remove(&mut self, id: SourceId) {
        self.store.remove(id);
        self.publish();
    }

    pub fn list_images(&self) -> impl Iterator<Item = &Source> + '_ {
        self.store.list_images()
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<[Source]>> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(Arc::from(self.store.sources().to_vec()));
    }
}

impl Default for SourceService {
    fn default() -> Self {
        Self::new()
    }
}
