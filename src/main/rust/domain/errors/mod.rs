use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    #[error("Invalid port: port cannot be zero")]
    InvalidPort,

    #[error("Invalid backoff multiplier: must be > 1.0")]
    InvalidBackoffMultiplier,

    #[error("Invalid frame rate: must be > 0")]
    InvalidFrameRate,

    #[error("Invalid slice duration: must be > 0 ms")]
    InvalidSliceDuration,

    #[error("Invalid stage size: {width}x{height}")]
    InvalidStageSize { width: u32, height: u32 },

    #[error("Stage output surface is not available")]
    OutputSurfaceUnavailable,

    #[error("A broadcast session is already active ({0})")]
    SessionActive(String),

    #[error("Relay process unavailable: {0}")]
    RelayUnavailable(String),

    #[error("Transport failed: {0}")]
    TransportFailed(String),

    #[error("Transport is closed")]
    TransportClosed,

    #[error("Encoder is already running")]
    EncoderAlreadyRunning,

    #[error("Encoder pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    #[error("Encoder pipeline execution failed: {0}")]
    PipelineExecutionFailed(String),

    #[error("Text rasterization failed: {0}")]
    TextRasterization(String),

    #[error("Broadcast controller has shut down")]
    ControllerShutdown,
}

pub type Result<T> = std::result::Result<T, DomainError>;
