use std::fmt;

/// Broadcast session states (pure domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session; a new one may be started
    #[default]
    Idle,
    /// Relay is up, waiting for the socket to open
    Connecting,
    /// Socket open, encoder chunks flowing
    Streaming,
    /// Socket closing or closed, waiting for the encoder to drain
    Stopping,
    /// Session ended without ever streaming (connect timeout or refused socket)
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Streaming => write!(f, "STREAMING"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl SessionStatus {
    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Connecting => 1.0,
            Self::Streaming => 2.0,
            Self::Stopping => 3.0,
            Self::Failed => 4.0,
        }
    }

    /// A socket is held in these states
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming | Self::Stopping)
    }

    /// Only a streaming session forwards encoder chunks
    pub fn accepts_chunks(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// States from which a fresh session may be started
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}
