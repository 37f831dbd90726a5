use std::sync::Arc;

use image::RgbaImage;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::TextRenderer;

/// Glyph height relative to the box height
const FONT_SIZE_RATIO: f64 = 0.8;

/// Lays text out as an SVG `<text>` element and rasterizes it with resvg.
///
/// Fonts come from the system font database, loaded once at construction.
pub struct SvgTextRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
    fill: String,
    font_family: String,
}

impl SvgTextRenderer {
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.faces().count(), "Font database loaded");

        Self {
            fontdb: Arc::new(db),
            fill: "#ffffff".to_string(),
            font_family: "sans-serif".to_string(),
        }
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    fn svg_markup(&self, content: &str, width: u32, height: u32) -> String {
        let font_size = f64::from(height) * FONT_SIZE_RATIO;
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><text x="0" y="{font_size:.2}" font-family="{family}" font-size="{font_size:.2}" fill="{fill}" textLength="{width}" lengthAdjust="spacingAndGlyphs">{text}</text></svg>"#,
            family = escape_xml(&self.font_family),
            fill = escape_xml(&self.fill),
            text = escape_xml(content),
        )
    }
}

impl Default for SvgTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRenderer for SvgTextRenderer {
    fn render(&self, content: &str, width: u32, height: u32) -> Result<RgbaImage> {
        let markup = self.svg_markup(content, width, height);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&markup, &opts)
            .map_err(|e| DomainError::TextRasterization(e.to_string()))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            DomainError::TextRasterization(format!("cannot allocate {width}x{height} pixmap"))
        })?;
        resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha; the stage canvas is straight alpha
        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| DomainError::TextRasterization("raster size mismatch".to_string()))
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
