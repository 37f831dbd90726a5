use crate::domain::errors::{DomainError, Result};

/// Share of the viewport height given to the stage
const STAGE_VIEWPORT_RATIO: f64 = 0.6;

/// Width of the avatar render target
pub const AVATAR_INSET_WIDTH: u32 = 200;

/// Share of the stage height given to the avatar render target
const AVATAR_INSET_HEIGHT_RATIO: f64 = 0.6;

/// Fixed 16:9 stage geometry. Recomputed on layout change only, never per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    width: u32,
    height: u32,
}

impl StageLayout {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidStageSize { width, height });
        }
        Ok(Self { width, height })
    }

    /// Stage height is 60% of the viewport; width follows from the 16:9 aspect
    pub fn from_viewport_height(viewport_height: u32) -> Result<Self> {
        let height = f64::from(viewport_height) * STAGE_VIEWPORT_RATIO;
        let width = height / 9.0 * 16.0;
        Self::new(width.round() as u32, height.round() as u32)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size the avatar surface should render at for this stage
    pub fn avatar_inset_size(&self) -> (u32, u32) {
        let height = (f64::from(self.height) * AVATAR_INSET_HEIGHT_RATIO).round() as u32;
        (AVATAR_INSET_WIDTH, height.max(1))
    }

    /// Top-left corner that anchors a frame of the given size to the bottom-right corner.
    ///
    /// Uses the frame's own resolution, so the anchor holds whatever size the
    /// avatar renderer produces. Frames larger than the stage yield negative origins.
    pub fn avatar_origin(&self, frame_width: u32, frame_height: u32) -> (i64, i64) {
        (
            i64::from(self.width) - i64::from(frame_width),
            i64::from(self.height) - i64::from(frame_height),
        )
    }
}
