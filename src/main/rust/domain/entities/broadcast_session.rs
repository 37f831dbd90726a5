use std::collections::VecDeque;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::value_objects::SessionStatus;

/// Transitions kept for inspection; older entries are discarded
const HISTORY_LIMIT: usize = 64;

/// Inputs to the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StartRequested,
    SocketOpened,
    FinishRequested,
    SocketClosed,
    EncoderStopped,
    ConnectTimedOut,
    /// Relay or transport could not be brought up
    StartFailed,
}

/// Side effects the driver must perform, in order, after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    OpenSocket,
    StartEncoder,
    StopEncoder,
    /// Close the socket if one is held and release it; no-op otherwise
    CloseSocket,
}

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Point-in-time view of a session for observers outside the driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    pub streaming_since: Option<Instant>,
}

impl SessionSnapshot {
    /// Elapsed broadcast time as `HH:MM:SS`, while streaming
    pub fn broadcast_time(&self) -> Option<String> {
        self.streaming_since
            .map(|since| format_broadcast_time(since.elapsed()))
    }
}

/// The single broadcast session owned by a controller.
///
/// Holds no I/O handles; `handle` is the only way to change status and it
/// returns what the driver must do about it.
#[derive(Debug)]
pub struct BroadcastSession {
    id: Option<String>,
    status: SessionStatus,
    history: VecDeque<StateTransition>,
    streaming_since: Option<Instant>,
}

impl BroadcastSession {
    pub fn new() -> Self {
        Self {
            id: None,
            status: SessionStatus::Idle,
            history: VecDeque::new(),
            streaming_since: None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn transition_count(&self) -> usize {
        self.history.len()
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.history.back()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &StateTransition> {
        self.history.iter()
    }

    /// Time spent streaming in the current session
    pub fn streaming_uptime(&self) -> Option<Duration> {
        self.streaming_since.map(|start| start.elapsed())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            status: self.status,
            streaming_since: self.streaming_since,
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        use SessionEffect::*;
        use SessionStatus as S;

        match (self.status, event) {
            (S::Idle | S::Failed, SessionEvent::StartRequested) => {
                self.id = Some(Uuid::new_v4().to_string());
                self.record_transition(S::Connecting, None);
                vec![OpenSocket]
            }
            (S::Connecting, SessionEvent::SocketOpened) => {
                self.streaming_since = Some(Instant::now());
                self.record_transition(S::Streaming, None);
                vec![StartEncoder]
            }
            (S::Connecting, SessionEvent::FinishRequested) => {
                self.record_transition(S::Idle, Some("finished before socket opened".into()));
                vec![CloseSocket]
            }
            (S::Connecting, SessionEvent::ConnectTimedOut) => {
                self.record_transition(S::Failed, Some("connect timed out".into()));
                vec![CloseSocket]
            }
            (S::Connecting, SessionEvent::StartFailed) => {
                self.record_transition(S::Failed, Some("relay or transport unavailable".into()));
                vec![CloseSocket]
            }
            (S::Connecting, SessionEvent::SocketClosed) => {
                self.record_transition(S::Failed, Some("socket closed before opening".into()));
                vec![CloseSocket]
            }
            (S::Streaming, SessionEvent::FinishRequested) => {
                self.record_transition(S::Stopping, Some("finish requested".into()));
                vec![StopEncoder, CloseSocket]
            }
            (S::Streaming, SessionEvent::SocketClosed) => {
                self.record_transition(S::Stopping, Some("closed by peer".into()));
                vec![StopEncoder, CloseSocket]
            }
            (S::Streaming, SessionEvent::EncoderStopped) => {
                self.record_transition(S::Idle, Some("encoder stopped".into()));
                vec![CloseSocket]
            }
            (S::Stopping, SessionEvent::EncoderStopped) => {
                self.record_transition(S::Idle, None);
                vec![CloseSocket]
            }
            (S::Failed, SessionEvent::FinishRequested) => {
                self.record_transition(S::Idle, None);
                Vec::new()
            }
            (status, event) => {
                tracing::debug!(%status, ?event, "Session event ignored");
                Vec::new()
            }
        }
    }

    fn record_transition(&mut self, new_status: SessionStatus, reason: Option<String>) {
        let transition = StateTransition {
            from: self.status,
            to: new_status,
            timestamp: Instant::now(),
            reason,
        };

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(transition);
        self.status = new_status;

        if !matches!(new_status, SessionStatus::Streaming | SessionStatus::Stopping) {
            self.streaming_since = None;
        }
        if new_status == SessionStatus::Idle {
            self.id = None;
        }
    }
}

impl Default for BroadcastSession {
    fn default() -> Self {
        Self::new()
    }
}

/// `HH:MM:SS` rendering of a broadcast duration
pub fn format_broadcast_time(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
