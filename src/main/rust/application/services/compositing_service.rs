use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::entities::Source;
use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::StageFrame;
use crate::infrastructure::render::Compositor;

/// Single consumer repainting the stage whenever either producer changes.
///
/// Both inputs are latest-value channels, so a slow repaint never blocks the
/// source editor or the avatar renderer; intermediate values are skipped.
/// Repaints decode and scale images, so they run on the blocking pool.
pub struct CompositingService {
    compositor: Option<Compositor>,
    sources: watch::Receiver<Arc<[Source]>>,
    avatar: watch::Receiver<Option<StageFrame>>,
    metrics: Arc<dyn MetricsReporter>,
}

impl CompositingService {
    pub fn new(
        compositor: Compositor,
        sources: watch::Receiver<Arc<[Source]>>,
        avatar: watch::Receiver<Option<StageFrame>>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        Self {
            compositor: Some(compositor),
            sources,
            avatar,
            metrics,
        }
    }

    /// Repaint until both producers are gone, then hand the compositor back.
    /// `None` if a repaint panicked and took the compositor with it.
    pub async fn run(mut self) -> Option<Compositor> {
        self.repaint_sources().await;
        self.blit_latest_avatar().await;

        let mut sources_open = true;
        let mut avatar_open = true;

        while (sources_open || avatar_open) && self.compositor.is_some() {
            tokio::select! {
                changed = self.sources.changed(), if sources_open => match changed {
                    Ok(()) => self.repaint_sources().await,
                    Err(_) => {
                        tracing::debug!("Source producer closed");
                        sources_open = false;
                    }
                },
                changed = self.avatar.changed(), if avatar_open => match changed {
                    Ok(()) => self.blit_latest_avatar().await,
                    Err(_) => {
                        tracing::debug!("Avatar producer closed");
                        avatar_open = false;
                    }
                },
            }
        }

        tracing::info!("Compositing loop finished");
        self.compositor
    }

    async fn repaint_sources(&mut self) {
        let snapshot = self.sources.borrow_and_update().clone();
        self.paint(move |compositor| compositor.render_sources(&snapshot)).await;
    }

    async fn blit_latest_avatar(&mut self) {
        let frame = self.avatar.borrow_and_update().clone();
        if let Some(frame) = frame {
            self.paint(move |compositor| compositor.blit_avatar(frame)).await;
        }
    }

    async fn paint<F>(&mut self, paint: F)
    where
        F: FnOnce(&mut Compositor) -> bool + Send + 'static,
    {
        let Some(mut compositor) = self.compositor.take() else {
            return;
        };

        let result = tokio::task::spawn_blocking(move || {
            let painted = paint(&mut compositor);
            (compositor, painted)
        })
        .await;

        match result {
            Ok((compositor, painted)) => {
                self.compositor = Some(compositor);
                if painted {
                    self.metrics.report_frame_composited();
                }
            }
            Err(e) => tracing::error!("Stage repaint failed: {}", e),
        }
    }
}
