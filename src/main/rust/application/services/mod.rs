mod broadcast_service;
mod compositing_service;
mod source_service;

pub use broadcast_service::{BroadcastController, BroadcastSettings};
pub use compositing_service::CompositingService;
pub use source_service::SourceService;
