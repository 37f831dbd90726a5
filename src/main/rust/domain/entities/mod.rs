mod broadcast_session;
mod source;
mod source_store;

pub use broadcast_session::{
    format_broadcast_time, BroadcastSession, SessionEffect, SessionEvent, SessionSnapshot,
    StateTransition,
};
pub use source::{Source, SourceId, SourceKind};
pub use source_store::SourceStore;
