use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use pipeline_vcast::{
    serve_metrics, spawn_test_pattern, AvatarSurface, BroadcastController, CaptureStream,
    CompositingService, Compositor, Config, FsImageCache, GStreamerEncoder,
    ImageProvider, LoopbackRelay, PrometheusReporter, SourceService, SvgTextRenderer,
    WebSocketTransport, DEFAULT_ORIGIN,
};

/// Height of text overlay boxes in stage pixels
const TEXT_BOX_HEIGHT: f64 = 48.0;

/// Vertical gap between stacked overlays
const OVERLAY_SPACING: f64 = 8.0;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Initialize GStreamer (infrastructure concern)
    gstreamer::init()?;

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    // Convert CLI config to domain configs
    let layout = config
        .to_stage_layout()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let settings = config
        .to_broadcast_settings()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let backoff_policy = config
        .to_backoff_policy()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("Starting pipeline-vcast v{}", env!("CARGO_PKG_VERSION"));
    info!("  Stage: {}x{}", layout.width(), layout.height());
    info!("  Relay: {}", settings.endpoint.url());
    info!("  Metrics port: {}", config.metrics_port);

    // Create infrastructure implementations (dependency injection)
    let images = Arc::new(FsImageCache::new());
    let text = Arc::new(
        SvgTextRenderer::new()
            .with_fill(config.text_fill.clone())
            .with_font_family(config.font_family.clone()),
    );
    let metrics_reporter = Arc::new(PrometheusReporter::new());

    let mut compositor = Compositor::new(layout, images.clone(), text);
    compositor.mount();

    // Overlays from the command line, stacked down the left edge
    let mut sources = SourceService::new();
    let mut next_y = DEFAULT_ORIGIN;
    for content in &config.texts {
        sources.add_text(content.clone(), f64::from(layout.width()) / 3.0, TEXT_BOX_HEIGHT);
        next_y = stack_last(&mut sources, next_y);
    }
    for path in &config.images {
        let Some(image) = images.image(path) else {
            warn!(path = %path.display(), "Skipping unreadable image overlay");
            continue;
        };
        let (width, height) = image.dimensions();
        sources.add_image(path.clone(), None, f64::from(width), f64::from(height));
        next_y = stack_last(&mut sources, next_y);
    }

    // Avatar frames come from a built-in test pattern in the headless binary
    let avatar = Arc::new(AvatarSurface::new());
    let (inset_width, inset_height) = layout.avatar_inset_size();
    let avatar_task = spawn_test_pattern(
        avatar.clone(),
        inset_width,
        inset_height,
        config.frame_rate,
    );

    let capture = CaptureStream::acquire(&compositor, config.frame_rate)?;

    let compositing = CompositingService::new(
        compositor,
        sources.subscribe(),
        avatar.subscribe(),
        metrics_reporter.clone(),
    );
    let compositing_task = tokio::spawn(compositing.run());

    let relay = Arc::new(LoopbackRelay::new(settings.endpoint.clone(), backoff_policy));
    let controller = BroadcastController::spawn(
        Box::new(GStreamerEncoder::new()),
        Box::new(WebSocketTransport::new()),
        relay,
        metrics_reporter,
        settings,
    );

    // Start metrics server
    let metrics_port = config.metrics_port;
    let snapshots = controller.subscribe();
    tokio::spawn(async move {
        serve_metrics(metrics_port, snapshots).await;
    });

    controller.set_media_source(capture);

    match &config.stream_key {
        Some(key) => {
            if let Err(e) = controller.start_streaming(key.clone()).await {
                error!("Broadcast failed to start: {}", e);
                let _ = controller.shutdown().await;
                return Err(anyhow::anyhow!("{}", e));
            }
        }
        None => info!("No stream key configured, compositing without broadcasting"),
    }

    info!("-------------------------------------------------------");
    info!("Broadcaster Ready");
    info!("   Metrics: http://0.0.0.0:{}/metrics", config.metrics_port);
    info!("   Status:  http://0.0.0.0:{}/status", config.metrics_port);
    info!("-------------------------------------------------------");

    // Handle graceful shutdown
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received (Ctrl+C)"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }

    if let Some(elapsed) = controller.broadcast_time() {
        info!("Broadcast time: {}", elapsed);
    }
    if let Err(e) = controller.shutdown().await {
        warn!("Broadcast did not finish cleanly: {}", e);
    }

    avatar_task.abort();
    drop(sources);
    drop(avatar);
    compositing_task.abort();

    info!("Broadcaster stopped gracefully");
    Ok(())
}

/// Move the most recently added overlay to `y` and return the next free row
fn stack_last(sources: &mut SourceService, y: f64) -> f64 {
    let Some(last) = sources.store().sources().last().cloned() else {
        return y;
    };
    let geometry = last.geometry();
    sources.update(last.with_geometry(geometry.moved_to(geometry.x, y)));
    y + geometry.height + OVERLAY_SPACING
}
