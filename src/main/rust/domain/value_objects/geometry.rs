use serde::Serialize;

/// Offset applied to freshly created sources
pub const DEFAULT_ORIGIN: f64 = 4.0;

/// Position and size of a source on the stage, in stage pixels.
///
/// Values are taken as given; negative or zero sizes simply draw nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn at_default_origin(width: f64, height: f64) -> Self {
        Self::new(DEFAULT_ORIGIN, DEFAULT_ORIGIN, width, height)
    }

    pub fn moved_to(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    pub fn resized_to(self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    /// Pixel size to rasterize at, or `None` when nothing would be visible
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        let w = self.width.round();
        let h = self.height.round();
        if !w.is_finite() || !h.is_finite() || w < 1.0 || h < 1.0 {
            return None;
        }
        Some((w as u32, h as u32))
    }

    pub fn pixel_origin(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}
