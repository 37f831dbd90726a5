use std::time::Duration;

use crate::domain::errors::{DomainError, Result};

pub const DEFAULT_SLICE: Duration = Duration::from_millis(1000);
pub const DEFAULT_VIDEO_BITRATE: u32 = 4_096_000;
pub const DEFAULT_AUDIO_BITRATE: u32 = 128_000;

/// Encoder knobs. Bitrates trade quality for size; nothing branches on them.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    slice: Duration,
    video_bitrate: u32,
    audio_bitrate: u32,
    include_audio: bool,
}

impl EncoderConfig {
    pub fn new(slice: Duration) -> Result<Self> {
        if slice.is_zero() {
            return Err(DomainError::InvalidSliceDuration);
        }
        Ok(Self {
            slice,
            ..Self::default()
        })
    }

    pub fn with_video_bitrate(mut self, bits_per_second: u32) -> Self {
        self.video_bitrate = bits_per_second;
        self
    }

    pub fn with_audio_bitrate(mut self, bits_per_second: u32) -> Self {
        self.audio_bitrate = bits_per_second;
        self
    }

    /// Adds a silent audio track so players that expect one can attach
    pub fn with_silent_audio(mut self, enabled: bool) -> Self {
        self.include_audio = enabled;
        self
    }

    pub fn slice(&self) -> Duration {
        self.slice
    }

    pub fn video_bitrate(&self) -> u32 {
        self.video_bitrate
    }

    pub fn audio_bitrate(&self) -> u32 {
        self.audio_bitrate
    }

    pub fn include_audio(&self) -> bool {
        self.include_audio
    }

    pub fn mime_type(&self) -> &'static str {
        "video/webm"
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            slice: DEFAULT_SLICE,
            video_bitrate: DEFAULT_VIDEO_BITRATE,
            audio_bitrate: DEFAULT_AUDIO_BITRATE,
            include_audio: false,
        }
    }
}
