use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::watch;

use crate::domain::errors::{DomainError, Result};

/// One merged stage raster
pub type StageFrame = Arc<RgbaImage>;

/// Default capture sampling rate
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Continuously sampled video signal taken from the stage output.
///
/// Cloning is cheap; every clone observes the same latest frame.
#[derive(Debug, Clone)]
pub struct MediaSignal {
    frames: watch::Receiver<Option<StageFrame>>,
    frame_rate: u32,
    width: u32,
    height: u32,
}

impl MediaSignal {
    pub fn new(
        frames: watch::Receiver<Option<StageFrame>>,
        frame_rate: u32,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if frame_rate == 0 {
            return Err(DomainError::InvalidFrameRate);
        }
        if width == 0 || height == 0 {
            return Err(DomainError::InvalidStageSize { width, height });
        }
        Ok(Self {
            frames,
            frame_rate,
            width,
            height,
        })
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Latest stage frame; never waits for a new one
    pub fn sample(&self) -> Option<StageFrame> {
        self.frames.borrow().clone()
    }
}
