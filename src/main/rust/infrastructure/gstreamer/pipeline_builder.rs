use crate::domain::value_objects::EncoderConfig;

/// Element names the encoder looks up after parsing
pub const SOURCE_NAME: &str = "stage_src";
pub const SINK_NAME: &str = "chunk_sink";

pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Build the GStreamer pipeline string for stage frames to streamable WebM.
    /// Raw RGBA frames are pushed into the appsrc by the encoder; caps are set on it
    /// programmatically because they depend on the stage size.
    pub fn build_pipeline_string(config: &EncoderConfig) -> String {
        // deadline=1 selects vp8enc's realtime mode
        // streamable=true keeps webmmux from seeking back to rewrite headers
        let video = format!(
            "appsrc name={SOURCE_NAME} is-live=true format=time do-timestamp=false ! \
             videoconvert ! \
             vp8enc target-bitrate={} deadline=1 ! \
             webmmux name=mux streamable=true ! \
             appsink name={SINK_NAME} sync=false emit-signals=false",
            config.video_bitrate()
        );

        if !config.include_audio() {
            return video;
        }

        format!(
            "{video} \
             audiotestsrc wave=silence is-live=true ! \
             audioconvert ! audioresample ! \
             opusenc bitrate={} ! mux.",
            config.audio_bitrate()
        )
    }
}
