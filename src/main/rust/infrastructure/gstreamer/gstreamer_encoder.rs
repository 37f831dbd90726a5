use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;
use bytes::BytesMut;
use gstreamer::prelude::*;

use super::pipeline_builder::{SINK_NAME, SOURCE_NAME};
use super::PipelineBuilder;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{Encoder, PipelineSignal, SignalSender};
use crate::domain::value_objects::{Chunk, EncoderConfig, MediaSignal};

/// appsink pull timeout (100ms allows responsive shutdown)
const PULL_TIMEOUT_NS: u64 = 100_000_000;

/// Upper bound on waiting for EOS to drain through the muxer after stop
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Threads and flags of one encoder run
struct EncoderRun {
    stop_requested: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
}

impl EncoderRun {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn reap(&mut self) {
        for handle in [self.feeder.take(), self.drain.take()].into_iter().flatten() {
            if handle.join().is_err() {
                tracing::warn!("Encoder thread panicked");
            }
        }
    }
}

/// VP8/WebM chunking encoder backed by a GStreamer appsrc/appsink pipeline.
///
/// A feeder thread samples the stage signal at its frame rate and pushes raw
/// RGBA buffers; a drain thread pulls muxed WebM bytes and cuts them into
/// wall-clock slices.
pub struct GStreamerEncoder {
    run: Option<EncoderRun>,
}

impl GStreamerEncoder {
    pub fn new() -> Self {
        Self { run: None }
    }

    fn create_pipeline(config: &EncoderConfig) -> anyhow::Result<gstreamer::Pipeline> {
        let pipeline_str = PipelineBuilder::build_pipeline_string(config);
        tracing::info!("Creating pipeline: {}", pipeline_str);

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .context("Failed to parse pipeline")?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow::anyhow!("Failed to downcast to Pipeline"))?;

        Ok(pipeline)
    }

    fn element(pipeline: &gstreamer::Pipeline, name: &str) -> Result<gstreamer::Element> {
        pipeline
            .by_name(name)
            .ok_or_else(|| DomainError::PipelineCreationFailed(format!("missing element {name}")))
    }

    fn process_bus_message(
        msg: &gstreamer::Message,
        pipeline: &gstreamer::Pipeline,
    ) -> std::result::Result<(), DomainError> {
        match msg.view() {
            gstreamer::MessageView::Error(err) => {
                let error_msg = format!(
                    "Error from {:?}: {} ({:?})",
                    err.src().map(|s| s.path_string()),
                    err.error(),
                    err.debug()
                );
                Err(DomainError::PipelineExecutionFailed(error_msg))
            }
            gstreamer::MessageView::StateChanged(state_changed) => {
                if state_changed
                    .src()
                    .map(|s| s == pipeline)
                    .unwrap_or(false)
                {
                    tracing::debug!(
                        "Pipeline state changed from {:?} to {:?}",
                        state_changed.old(),
                        state_changed.current()
                    );
                }
                Ok(())
            }
            gstreamer::MessageView::Warning(warn) => {
                tracing::warn!(
                    "Warning from {:?}: {} ({:?})",
                    warn.src().map(|s| s.path_string()),
                    warn.error(),
                    warn.debug()
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn feed(
        src: gstreamer::Element,
        signal: MediaSignal,
        stop_requested: Arc<AtomicBool>,
    ) {
        let (width, height) = signal.dimensions();
        let interval = signal.frame_interval();
        let blank_len = (width as usize) * (height as usize) * 4;
        let started = Instant::now();
        let mut frame_index: u64 = 0;

        while !stop_requested.load(Ordering::SeqCst) {
            let pixels = match signal.sample() {
                Some(frame) if frame.dimensions() == (width, height) => frame.as_raw().clone(),
                Some(frame) => {
                    tracing::debug!(
                        "Skipping {}x{} frame on {}x{} stage",
                        frame.width(),
                        frame.height(),
                        width,
                        height
                    );
                    vec![0u8; blank_len]
                }
                None => vec![0u8; blank_len],
            };

            let pts = interval * frame_index as u32;
            let mut buffer = gstreamer::Buffer::from_mut_slice(pixels);
            if let Some(buffer) = buffer.get_mut() {
                buffer.set_pts(gstreamer::ClockTime::from_nseconds(pts.as_nanos() as u64));
                buffer.set_duration(gstreamer::ClockTime::from_nseconds(
                    interval.as_nanos() as u64,
                ));
            }

            let flow = src.emit_by_name::<gstreamer::FlowReturn>("push-buffer", &[&buffer]);
            if flow != gstreamer::FlowReturn::Ok {
                tracing::warn!("appsrc refused buffer: {:?}", flow);
                break;
            }

            frame_index += 1;
            let next_due = started + interval * frame_index as u32;
            if let Some(wait) = next_due.checked_duration_since(Instant::now()) {
                std::thread::sleep(wait);
            }
        }

        let _ = src.emit_by_name::<gstreamer::FlowReturn>("end-of-stream", &[]);
        tracing::debug!(frames = frame_index, "Stage feeder finished");
    }

    fn drain(
        pipeline: gstreamer::Pipeline,
        sink: gstreamer::Element,
        slice: Duration,
        session_id: String,
        signals: SignalSender,
        stop_requested: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    ) {
        let bus = pipeline.bus();
        let mut pending = BytesMut::new();
        let mut sequence: u64 = 0;
        let mut slice_started = Instant::now();
        let mut stop_seen: Option<Instant> = None;

        let mut emit = |pending: &mut BytesMut| {
            if pending.is_empty() {
                return;
            }
            let chunk = Chunk::new(sequence, pending.split().freeze());
            tracing::trace!(sequence, bytes = chunk.len(), "Chunk ready");
            sequence += 1;
            let _ = signals.send(PipelineSignal::Chunk(chunk));
        };

        loop {
            if let Some(bus) = &bus {
                if let Some(msg) = bus.pop() {
                    if let Err(e) = Self::process_bus_message(&msg, &pipeline) {
                        tracing::error!("Encoder pipeline error: {}", e);
                        break;
                    }
                }
            }

            let sample = sink
                .emit_by_name::<Option<gstreamer::Sample>>("try-pull-sample", &[&PULL_TIMEOUT_NS]);
            match sample {
                Some(sample) => {
                    if let Some(buffer) = sample.buffer() {
                        match buffer.map_readable() {
                            Ok(map) => pending.extend_from_slice(map.as_slice()),
                            Err(e) => tracing::warn!("Unreadable encoder buffer: {}", e),
                        }
                    }
                }
                None => {
                    if sink.property::<bool>("eos") {
                        tracing::debug!("Encoder reached end of stream");
                        break;
                    }
                }
            }

            if stop_requested.load(Ordering::SeqCst) {
                let since = *stop_seen.get_or_insert_with(Instant::now);
                if since.elapsed() >= DRAIN_TIMEOUT {
                    tracing::warn!("Encoder drain timed out after {:?}", DRAIN_TIMEOUT);
                    break;
                }
            } else if slice_started.elapsed() >= slice {
                emit(&mut pending);
                slice_started = Instant::now();
            }
        }

        // in-flight slice goes out before the stop signal
        emit(&mut pending);
        let _ = pipeline.set_state(gstreamer::State::Null);
        finished.store(true, Ordering::SeqCst);
        let _ = signals.send(PipelineSignal::EncoderStopped {
            session_id: session_id.clone(),
        });
        tracing::info!(session_id = %session_id, "Encoder stopped");
    }
}

impl Default for GStreamerEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for GStreamerEncoder {
    fn start(
        &mut self,
        signal: MediaSignal,
        config: &EncoderConfig,
        session_id: &str,
        sink: SignalSender,
    ) -> Result<()> {
        if self.is_running() {
            return Err(DomainError::EncoderAlreadyRunning);
        }
        if let Some(mut previous) = self.run.take() {
            previous.reap();
        }

        let pipeline = Self::create_pipeline(config)
            .map_err(|e| DomainError::PipelineCreationFailed(e.to_string()))?;
        let src = Self::element(&pipeline, SOURCE_NAME)?;
        let appsink = Self::element(&pipeline, SINK_NAME)?;

        let (width, height) = signal.dimensions();
        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", width as i32)
            .field("height", height as i32)
            .field(
                "framerate",
                gstreamer::Fraction::new(signal.frame_rate() as i32, 1),
            )
            .build();
        src.set_property("caps", &caps);

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| DomainError::PipelineExecutionFailed(e.to_string()))?;

        let stop_requested = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let feeder = {
            let stop_requested = stop_requested.clone();
            std::thread::Builder::new()
                .name("stage-feeder".to_string())
                .spawn(move || Self::feed(src, signal, stop_requested))
        };
        let feeder = match feeder {
            Ok(handle) => handle,
            Err(e) => {
                let _ = pipeline.set_state(gstreamer::State::Null);
                return Err(DomainError::PipelineCreationFailed(e.to_string()));
            }
        };

        let drain = {
            let stop_requested = stop_requested.clone();
            let finished = finished.clone();
            let slice = config.slice();
            let session_id = session_id.to_string();
            std::thread::Builder::new()
                .name("chunk-drain".to_string())
                .spawn(move || {
                    Self::drain(
                        pipeline,
                        appsink,
                        slice,
                        session_id,
                        sink,
                        stop_requested,
                        finished,
                    )
                })
        };
        let drain = match drain {
            Ok(handle) => handle,
            Err(e) => {
                stop_requested.store(true, Ordering::SeqCst);
                return Err(DomainError::PipelineCreationFailed(e.to_string()));
            }
        };

        tracing::info!(
            width,
            height,
            slice_ms = config.slice().as_millis() as u64,
            mime = config.mime_type(),
            "Encoder started"
        );

        self.run = Some(EncoderRun {
            stop_requested,
            finished,
            feeder: Some(feeder),
            drain: Some(drain),
        });
        Ok(())
    }

    fn stop(&mut self) {
        match &self.run {
            Some(run) if !run.is_finished() => {
                if !run.stop_requested.swap(true, Ordering::SeqCst) {
                    tracing::info!("Stopping encoder");
                }
            }
            _ => tracing::debug!("Encoder not running, nothing to stop"),
        }
    }

    fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .map(|run| !run.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for GStreamerEncoder {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.stop_requested.store(true, Ordering::SeqCst);
        }
    }
}
