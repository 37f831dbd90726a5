mod avatar_surface;
mod capture_stream;
mod compositor;
mod image_cache;
mod text_rasterizer;

pub use avatar_surface::{spawn_test_pattern, AvatarSurface};
pub use capture_stream::CaptureStream;
pub use compositor::Compositor;
pub use image_cache::FsImageCache;
pub use text_rasterizer::SvgTextRenderer;
