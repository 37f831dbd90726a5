mod gstreamer_encoder;
mod pipeline_builder;

pub use gstreamer_encoder::GStreamerEncoder;
pub use pipeline_builder::PipelineBuilder;
