pub mod gstreamer;
pub mod metrics;
pub mod relay;
pub mod render;
pub mod websocket;
