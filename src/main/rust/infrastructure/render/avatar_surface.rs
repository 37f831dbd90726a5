use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::value_objects::StageFrame;

/// Render target of the avatar renderer.
///
/// The renderer presents frames on its own cadence; readers only ever see the
/// latest one plus a change notification, and never block the renderer.
pub struct AvatarSurface {
    frames: watch::Sender<Option<StageFrame>>,
}

impl AvatarSurface {
    pub fn new() -> Self {
        let (frames, _) = watch::channel(None);
        Self { frames }
    }

    pub fn present(&self, frame: RgbaImage) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    pub fn latest(&self) -> Option<StageFrame> {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StageFrame>> {
        self.frames.subscribe()
    }
}

impl Default for AvatarSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Stand-in renderer for headless runs: a slowly sweeping gradient with a bar
/// that bounces vertically, presented `fps` times per second until the surface
/// has no readers left.
pub fn spawn_test_pattern(
    surface: Arc<AvatarSurface>,
    width: u32,
    height: u32,
    fps: u32,
) -> JoinHandle<()> {
    let period = Duration::from_secs(1) / fps.max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut tick: u32 = 0;
        loop {
            ticker.tick().await;
            if surface.frames.is_closed() {
                tracing::debug!("Avatar surface has no readers, test pattern stopped");
                break;
            }
            surface.present(test_pattern_frame(width, height, tick));
            tick = tick.wrapping_add(1);
        }
    })
}

fn test_pattern_frame(width: u32, height: u32, tick: u32) -> RgbaImage {
    let span = height.max(1) * 2;
    let phase = tick % span;
    let bar_y = if phase < height { phase } else { span - phase - 1 };

    RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
        if y.abs_diff(bar_y) < 4 {
            return Rgba([255, 255, 255, 255]);
        }
        let r = ((x * 255) / width.max(1)) as u8;
        let g = ((y * 255) / height.max(1)) as u8;
        let b = (tick % 256) as u8;
        Rgba([r, g, b, 255])
    })
}
