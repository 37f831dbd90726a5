mod backoff_policy;
mod chunk;
mod encoder_config;
mod geometry;
mod media_signal;
mod relay_endpoint;
mod session_status;
mod stage_layout;

pub use backoff_policy::BackoffPolicy;
pub use chunk::Chunk;
pub use encoder_config::{
    EncoderConfig, DEFAULT_AUDIO_BITRATE, DEFAULT_SLICE, DEFAULT_VIDEO_BITRATE,
};
pub use geometry::{Geometry, DEFAULT_ORIGIN};
pub use media_signal::{MediaSignal, StageFrame, DEFAULT_FRAME_RATE};
pub use relay_endpoint::{RelayEndpoint, DEFAULT_RELAY_URL};
pub use session_status::SessionStatus;
pub use stage_layout::{StageLayout, AVATAR_INSET_WIDTH};
