use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::MediaSignal;

use super::Compositor;

/// Turns the compositor's output surface into a sampled media signal
pub struct CaptureStream;

impl CaptureStream {
    /// Acquire the signal at `frame_rate` samples per second.
    ///
    /// Fails when the stage surface is not mounted; callers treat that as
    /// fatal for the session and do not retry.
    pub fn acquire(compositor: &Compositor, frame_rate: u32) -> Result<MediaSignal> {
        if !compositor.is_mounted() {
            tracing::error!("Cannot find stage output surface");
            return Err(DomainError::OutputSurfaceUnavailable);
        }

        let layout = compositor.layout();
        let signal = MediaSignal::new(
            compositor.subscribe(),
            frame_rate,
            layout.width(),
            layout.height(),
        )?;

        tracing::info!(
            width = layout.width(),
            height = layout.height(),
            frame_rate,
            "Stage capture acquired"
        );
        Ok(signal)
    }
}
