use tokio::sync::mpsc;

use crate::domain::value_objects::Chunk;

/// Lifecycle and data signals raised by pipeline adapters.
///
/// Every adapter of a session posts into the same queue, so the driver sees
/// socket, chunk and encoder signals in the order they happened. Lifecycle
/// signals carry the id of the session whose link or encoder raised them;
/// the driver drops those that do not match the current session.
#[derive(Debug)]
pub enum PipelineSignal {
    SocketOpened { session_id: String },
    SocketClosed { session_id: String },
    Chunk(Chunk),
    EncoderStopped { session_id: String },
    ConnectTimedOut { session_id: String },
}

impl PipelineSignal {
    /// Session the signal belongs to; `None` for chunks
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SocketOpened { session_id }
            | Self::SocketClosed { session_id }
            | Self::EncoderStopped { session_id }
            | Self::ConnectTimedOut { session_id } => Some(session_id),
            Self::Chunk(_) => None,
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<PipelineSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<PipelineSignal>;
