use crate::domain::errors::Result;
use crate::domain::value_objects::{EncoderConfig, MediaSignal};

use super::SignalSender;

/// Port for chunking encoders
pub trait Encoder: Send {
    /// Start producing `PipelineSignal::Chunk`s, one per `config.slice()` of
    /// wall-clock time, numbered from 0. Fails if already running.
    fn start(
        &mut self,
        signal: MediaSignal,
        config: &EncoderConfig,
        session_id: &str,
        sink: SignalSender,
    ) -> Result<()>;

    /// Flush the in-flight slice, then post exactly one `EncoderStopped`
    /// tagged with the session id given to `start`.
    /// Returns without waiting for the flush; no-op when not running.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
