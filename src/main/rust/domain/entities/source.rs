use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::Geometry;

/// Opaque, globally unique source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Variant tag and payload in one; a source never changes kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Image { path: PathBuf },
    Text { content: String },
}

/// A placeable overlay on the stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    id: SourceId,
    name: String,
    #[serde(flatten)]
    kind: SourceKind,
    geometry: Geometry,
}

impl Source {
    /// Image source at the default origin. Without a usable name the label is
    /// the path's final segment.
    pub fn image(
        path: impl Into<PathBuf>,
        name: Option<String>,
        width: f64,
        height: f64,
    ) -> Self {
        let path = path.into();
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| file_name_of(&path));
        Self {
            id: SourceId::new(),
            name,
            kind: SourceKind::Image { path },
            geometry: Geometry::at_default_origin(width, height),
        }
    }

    /// Text source at the default origin, labelled with its own content
    pub fn text(content: impl Into<String>, width: f64, height: f64) -> Self {
        let content = content.into();
        Self {
            id: SourceId::new(),
            name: content.clone(),
            kind: SourceKind::Text { content },
            geometry: Geometry::at_default_origin(width, height),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, SourceKind::Image { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, SourceKind::Text { .. })
    }

    /// Copy with new geometry, same id and kind; pass it to the store's update
    pub fn with_geometry(&self, geometry: Geometry) -> Self {
        Self {
            geometry,
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Everything after the last `/`. A path with no `/`, or ending in one, is used whole.
fn file_name_of(path: &Path) -> String {
    let raw = path.to_string_lossy();
    match raw.rsplit_once('/') {
        Some((_, tail)) if !tail.is_empty() => tail.to_string(),
        _ => raw.into_owned(),
    }
}
