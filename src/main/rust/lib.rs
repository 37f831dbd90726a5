pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{
    BroadcastController, BroadcastSettings, CompositingService, SourceService,
};
pub use config::Config;
pub use domain::entities::{
    format_broadcast_time, BroadcastSession, SessionEffect, SessionEvent, SessionSnapshot, Source,
    SourceId, SourceKind, SourceStore, StateTransition,
};
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{
    Encoder, ImageProvider, MetricsReporter, PipelineSignal, RelayProcess, SignalReceiver,
    SignalSender, TextRenderer, Transport, TransportLink,
};
pub use domain::value_objects::{
    BackoffPolicy, Chunk, EncoderConfig, Geometry, MediaSignal, RelayEndpoint, SessionStatus,
    StageFrame, StageLayout, DEFAULT_ORIGIN,
};
pub use infrastructure::gstreamer::{GStreamerEncoder, PipelineBuilder};
pub use infrastructure::metrics::{serve_metrics, PrometheusReporter};
pub use infrastructure::relay::LoopbackRelay;
pub use infrastructure::render::{
    spawn_test_pattern, AvatarSurface, CaptureStream, Compositor, FsImageCache, SvgTextRenderer,
};
pub use infrastructure::websocket::WebSocketTransport;
