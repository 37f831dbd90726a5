use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::application::services::BroadcastSettings;
use crate::domain::value_objects::{
    BackoffPolicy, EncoderConfig, RelayEndpoint, StageLayout, DEFAULT_RELAY_URL,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipeline-vcast",
    version = "0.1.0",
    author = "Hawkeye Video Pipeline",
    about = "Stage compositor and WebM chunk broadcaster for a local relay"
)]
pub struct Config {
    /// Relay WebSocket URL
    #[arg(long, env = "RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,

    /// Broadcast credential handed to the relay
    #[arg(long, env = "STREAM_KEY", hide_env_values = true)]
    pub stream_key: Option<String>,

    /// Metrics server port
    #[arg(long, env = "METRICS_PORT", default_value = "9003")]
    pub metrics_port: u16,

    /// Viewport height the stage is derived from (stage = 60% of it, 16:9)
    #[arg(long, env = "VIEWPORT_HEIGHT", default_value = "1500")]
    pub viewport_height: u32,

    /// Capture sampling rate in frames per second
    #[arg(long, env = "FRAME_RATE", default_value = "30")]
    pub frame_rate: u32,

    /// Encoder chunk length in milliseconds
    #[arg(long, env = "SLICE_MS", default_value = "1000")]
    pub slice_ms: u64,

    /// Video bitrate in bits per second
    #[arg(long, env = "VIDEO_BITRATE", default_value = "4096000")]
    pub video_bitrate: u32,

    /// Audio bitrate in bits per second (silent track only)
    #[arg(long, env = "AUDIO_BITRATE", default_value = "128000")]
    pub audio_bitrate: u32,

    /// Mux a silent Opus track next to the video
    #[arg(long)]
    pub silent_audio: bool,

    /// Give up on the relay socket after this many seconds (waits forever if unset)
    #[arg(long, env = "CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: Option<u64>,

    /// Relay readiness probes before giving up
    #[arg(long, default_value = "10")]
    pub relay_probe_attempts: u32,

    /// Initial delay between relay probes in milliseconds
    #[arg(long, default_value = "100")]
    pub relay_initial_delay_ms: u64,

    /// Maximum delay between relay probes in milliseconds
    #[arg(long, default_value = "2000")]
    pub relay_max_delay_ms: u64,

    /// Relay probe backoff multiplier
    #[arg(long, default_value = "2.0")]
    pub relay_multiplier: f64,

    /// Text overlay to place on the stage (repeatable)
    #[arg(long = "text")]
    pub texts: Vec<String>,

    /// Image overlay to place on the stage (repeatable)
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,

    /// Fill colour for text overlays (any SVG colour)
    #[arg(long, env = "TEXT_FILL", default_value = "#ffffff")]
    pub text_fill: String,

    /// Font family for text overlays
    #[arg(long, env = "FONT_FAMILY", default_value = "sans-serif")]
    pub font_family: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.relay_url.starts_with("ws://") {
            anyhow::bail!("Relay URL must start with ws://");
        }
        let endpoint = self
            .to_relay_endpoint()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Self::validate_port(self.metrics_port, "metrics")?;

        if endpoint.port() == self.metrics_port {
            anyhow::bail!("Relay port and metrics port cannot be the same");
        }

        if self.viewport_height == 0 {
            anyhow::bail!("Viewport height cannot be 0");
        }

        if self.frame_rate == 0 {
            anyhow::bail!("Frame rate cannot be 0");
        }

        if self.slice_ms == 0 {
            anyhow::bail!("Slice length cannot be 0");
        }

        if self.text_fill.trim().is_empty() {
            anyhow::bail!("Text fill cannot be empty");
        }

        if self.font_family.trim().is_empty() {
            anyhow::bail!("Font family cannot be empty");
        }

        if self.connect_timeout_secs == Some(0) {
            anyhow::bail!("Connect timeout cannot be 0; leave it unset to wait forever");
        }

        if self.relay_probe_attempts == 0 {
            anyhow::bail!("Relay probe attempts cannot be 0");
        }

        if self.relay_multiplier <= 1.0 {
            anyhow::bail!("Relay backoff multiplier must be > 1.0");
        }

        if self.relay_initial_delay_ms == 0 {
            anyhow::bail!("Initial relay probe delay cannot be 0");
        }

        if self.relay_max_delay_ms < self.relay_initial_delay_ms {
            anyhow::bail!(
                "Maximum relay probe delay ({}) cannot be less than initial delay ({})",
                self.relay_max_delay_ms,
                self.relay_initial_delay_ms
            );
        }

        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    pub fn to_relay_endpoint(&self) -> crate::domain::errors::Result<RelayEndpoint> {
        RelayEndpoint::new(self.relay_url.clone())
    }

    pub fn to_backoff_policy(&self) -> crate::domain::errors::Result<BackoffPolicy> {
        BackoffPolicy::new(
            Duration::from_millis(self.relay_initial_delay_ms),
            Duration::from_millis(self.relay_max_delay_ms),
            self.relay_multiplier,
            self.relay_probe_attempts,
        )
    }

    pub fn to_encoder_config(&self) -> crate::domain::errors::Result<EncoderConfig> {
        Ok(EncoderConfig::new(Duration::from_millis(self.slice_ms))?
            .with_video_bitrate(self.video_bitrate)
            .with_audio_bitrate(self.audio_bitrate)
            .with_silent_audio(self.silent_audio))
    }

    pub fn to_stage_layout(&self) -> crate::domain::errors::Result<StageLayout> {
        StageLayout::from_viewport_height(self.viewport_height)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn to_broadcast_settings(&self) -> crate::domain::errors::Result<BroadcastSettings> {
        Ok(BroadcastSettings {
            encoder: self.to_encoder_config()?,
            endpoint: self.to_relay_endpoint()?,
            connect_timeout: self.connect_timeout(),
        })
    }
}
