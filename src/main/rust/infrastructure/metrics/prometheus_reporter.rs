use lazy_static::lazy_static;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::SessionStatus;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Session state (0=Idle, 1=Connecting, 2=Streaming, 3=Stopping, 4=Failed)
    pub static ref SESSION_STATE: Gauge = Gauge::new(
        "vcast_session_state",
        "Current broadcast session state"
    ).expect("metric can be created");

    pub static ref CHUNKS_SENT: IntCounter = IntCounter::new(
        "vcast_chunks_sent_total",
        "Encoded chunks forwarded to the relay"
    ).expect("metric can be created");

    pub static ref BYTES_SENT: IntCounter = IntCounter::new(
        "vcast_bytes_sent_total",
        "Encoded bytes forwarded to the relay"
    ).expect("metric can be created");

    // Chunks that arrived outside Streaming or could not be queued
    pub static ref CHUNKS_DROPPED: IntCounter = IntCounter::new(
        "vcast_chunks_dropped_total",
        "Encoded chunks discarded instead of forwarded"
    ).expect("metric can be created");

    pub static ref FRAMES_COMPOSITED: IntCounter = IntCounter::new(
        "vcast_frames_composited_total",
        "Stage repaints published to the capture signal"
    ).expect("metric can be created");

    pub static ref UPTIME_SECONDS: Gauge = Gauge::new(
        "vcast_broadcast_uptime_seconds",
        "Time since the current session started streaming"
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(SESSION_STATE.clone()))?;
        REGISTRY.register(Box::new(CHUNKS_SENT.clone()))?;
        REGISTRY.register(Box::new(BYTES_SENT.clone()))?;
        REGISTRY.register(Box::new(CHUNKS_DROPPED.clone()))?;
        REGISTRY.register(Box::new(FRAMES_COMPOSITED.clone()))?;
        REGISTRY.register(Box::new(UPTIME_SECONDS.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_state_change(&self, status: &SessionStatus) {
        SESSION_STATE.set(status.as_metric());
        if !status.is_active() {
            UPTIME_SECONDS.set(0.0);
        }
    }

    fn report_chunk_sent(&self, bytes: usize) {
        CHUNKS_SENT.inc();
        BYTES_SENT.inc_by(bytes as u64);
    }

    fn report_chunk_dropped(&self) {
        CHUNKS_DROPPED.inc();
    }

    fn report_frame_composited(&self) {
        FRAMES_COMPOSITED.inc();
    }

    fn report_uptime(&self, uptime_secs: f64) {
        UPTIME_SECONDS.set(uptime_secs);
    }
}
