use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::entities::{BroadcastSession, SessionEffect, SessionEvent, SessionSnapshot};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{
    Encoder, MetricsReporter, PipelineSignal, RelayProcess, SignalReceiver, SignalSender,
    Transport, TransportLink,
};
use crate::domain::value_objects::{
    Chunk, EncoderConfig, MediaSignal, RelayEndpoint, SessionStatus,
};

/// Session knobs fixed for the lifetime of a controller
#[derive(Debug, Clone, Default)]
pub struct BroadcastSettings {
    pub encoder: EncoderConfig,
    pub endpoint: RelayEndpoint,
    /// `None` waits in `Connecting` until the socket opens or closes
    pub connect_timeout: Option<Duration>,
}

enum Command {
    SetMediaSource(MediaSignal),
    Start {
        stream_key: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Finish {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Handle to the task that owns the broadcast session.
///
/// Commands and adapter signals are both handled by that one task, so the
/// session is never touched concurrently.
pub struct BroadcastController {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    driver: Option<JoinHandle<()>>,
}

impl BroadcastController {
    /// Spawn the session driver on the current tokio runtime
    pub fn spawn(
        encoder: Box<dyn Encoder>,
        transport: Box<dyn Transport>,
        relay: Arc<dyn RelayProcess>,
        metrics: Arc<dyn MetricsReporter>,
        settings: BroadcastSettings,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot::default());
        let (signals, signal_rx) = mpsc::unbounded_channel();

        let driver = SessionDriver {
            session: BroadcastSession::new(),
            encoder,
            transport,
            relay,
            metrics,
            settings,
            media: None,
            link: None,
            signals,
            connect_timer: None,
            pending_finish: Vec::new(),
            snapshots: snapshot_tx,
        };

        let driver = tokio::spawn(driver.run(command_rx, signal_rx));

        Self {
            commands,
            snapshots,
            driver: Some(driver),
        }
    }

    /// Attach the captured stage signal; ignored while a session is active
    pub fn set_media_source(&self, signal: MediaSignal) {
        let _ = self.commands.send(Command::SetMediaSource(signal));
    }

    /// Hand the key to the relay, wait for it, then dial the transport.
    ///
    /// Returns once the dial has begun; `Streaming` follows when the socket
    /// opens. Does nothing when no media source is attached.
    pub async fn start_streaming(&self, stream_key: impl Into<String>) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Start {
                stream_key: stream_key.into(),
                reply,
            })
            .map_err(|_| DomainError::ControllerShutdown)?;
        response.await.map_err(|_| DomainError::ControllerShutdown)?
    }

    /// Close the session if one is open and tear the relay down.
    /// Resolves once the session is idle.
    pub async fn finish_streaming(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Finish { reply })
            .map_err(|_| DomainError::ControllerShutdown)?;
        response.await.map_err(|_| DomainError::ControllerShutdown)?
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshots.borrow().status
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// `HH:MM:SS` since the session started streaming
    pub fn broadcast_time(&self) -> Option<String> {
        self.snapshots.borrow().broadcast_time()
    }

    /// Finish any session, then stop the driver task
    pub async fn shutdown(mut self) -> Result<()> {
        let finished = self.finish_streaming().await;
        drop(self.commands);
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::error!("Session driver task failed: {}", e);
            }
        }
        finished
    }
}

struct SessionDriver {
    session: BroadcastSession,
    encoder: Box<dyn Encoder>,
    transport: Box<dyn Transport>,
    relay: Arc<dyn RelayProcess>,
    metrics: Arc<dyn MetricsReporter>,
    settings: BroadcastSettings,
    media: Option<MediaSignal>,
    link: Option<Box<dyn TransportLink>>,
    signals: SignalSender,
    connect_timer: Option<JoinHandle<()>>,
    pending_finish: Vec<(oneshot::Sender<Result<()>>, Result<()>)>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: SignalReceiver,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(signal) = signals.recv() => self.handle_signal(signal).await,
            }
        }

        self.teardown().await;
        tracing::debug!("Session driver stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetMediaSource(signal) => {
                if self.session.status().is_active() {
                    tracing::debug!("Media source change ignored while session is active");
                } else {
                    self.media = Some(signal);
                }
            }
            Command::Start { stream_key, reply } => {
                let result = self.start(stream_key).await;
                let _ = reply.send(result);
            }
            Command::Finish { reply } => self.finish(reply).await,
        }
    }

    async fn handle_signal(&mut self, signal: PipelineSignal) {
        if let Some(session_id) = signal.session_id() {
            if self.session.id() != Some(session_id) {
                tracing::debug!(
                    session_id = %session_id,
                    current = ?self.session.id(),
                    "Signal from another session ignored"
                );
                return;
            }
        }

        let result = match signal {
            PipelineSignal::Chunk(chunk) => {
                self.forward_chunk(chunk);
                Ok(())
            }
            PipelineSignal::SocketOpened { .. } => {
                self.dispatch(SessionEvent::SocketOpened).await
            }
            PipelineSignal::SocketClosed { .. } => {
                self.dispatch(SessionEvent::SocketClosed).await
            }
            PipelineSignal::EncoderStopped { .. } => {
                self.dispatch(SessionEvent::EncoderStopped).await
            }
            PipelineSignal::ConnectTimedOut { session_id } => {
                tracing::warn!(session_id = %session_id, "Relay socket did not open in time");
                self.dispatch(SessionEvent::ConnectTimedOut).await
            }
        };

        if let Err(e) = result {
            tracing::error!("Session signal handling failed: {}", e);
        }
    }

    async fn start(&mut self, stream_key: String) -> Result<()> {
        if self.media.is_none() {
            tracing::debug!("No media source attached, start ignored");
            return Ok(());
        }

        let status = self.session.status();
        if !status.can_start() {
            return Err(DomainError::SessionActive(status.to_string()));
        }

        let effects = self.transition(SessionEvent::StartRequested);
        let session_id = self.session_id();
        tracing::info!(session_id = %session_id, "Starting broadcast");

        self.relay.send_stream_key(&stream_key);
        if let Err(e) = self.relay.start_server().await {
            tracing::error!(session_id = %session_id, "Relay failed to start: {}", e);
            self.dispatch(SessionEvent::StartFailed).await?;
            return Err(e);
        }

        self.execute(effects).await?;

        if self.session.status() == SessionStatus::Connecting {
            self.arm_connect_timer(session_id);
        }
        Ok(())
    }

    async fn finish(&mut self, reply: oneshot::Sender<Result<()>>) {
        let result = if self.session.status() == SessionStatus::Idle {
            tracing::debug!("Finish requested with no active session");
            Ok(())
        } else {
            self.dispatch(SessionEvent::FinishRequested).await
        };

        let teardown = self.relay.terminate_server().await;
        if let Err(e) = &teardown {
            tracing::warn!("Relay teardown failed: {}", e);
        }
        let result = result.and(teardown);

        if self.session.status() == SessionStatus::Idle {
            let _ = reply.send(result);
        } else {
            // answered once the encoder has drained
            self.pending_finish.push((reply, result));
        }
    }

    fn forward_chunk(&mut self, chunk: Chunk) {
        if !self.session.status().accepts_chunks() {
            tracing::trace!(sequence = chunk.sequence(), "Chunk dropped outside streaming");
            self.metrics.report_chunk_dropped();
            return;
        }

        let Some(link) = self.link.as_mut() else {
            self.metrics.report_chunk_dropped();
            return;
        };

        let sequence = chunk.sequence();
        let len = chunk.len();
        match link.send(chunk) {
            Ok(()) => {
                tracing::trace!(sequence, bytes = len, "Chunk forwarded");
                self.metrics.report_chunk_sent(len);
            }
            Err(e) => {
                tracing::warn!(sequence, "Chunk not forwarded: {}", e);
                self.metrics.report_chunk_dropped();
            }
        }

        if let Some(uptime) = self.session.streaming_uptime() {
            self.metrics.report_uptime(uptime.as_secs_f64());
        }
    }

    async fn dispatch(&mut self, event: SessionEvent) -> Result<()> {
        let effects = self.transition(event);
        self.execute(effects).await
    }

    /// Apply effects in order. A failed effect feeds its failure event back
    /// into the session so the state machine always settles.
    async fn execute(&mut self, effects: Vec<SessionEffect>) -> Result<()> {
        let mut queue: VecDeque<SessionEffect> = effects.into();
        let mut outcome = Ok(());

        while let Some(effect) = queue.pop_front() {
            let follow_up = match self.apply(effect).await {
                Ok(follow_up) => follow_up,
                Err(e) => {
                    tracing::warn!(?effect, "Session effect failed: {}", e);
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                    failure_event(effect)
                }
            };
            if let Some(event) = follow_up {
                queue.extend(self.transition(event));
            }
        }

        outcome
    }

    async fn apply(&mut self, effect: SessionEffect) -> Result<Option<SessionEvent>> {
        match effect {
            SessionEffect::OpenSocket => {
                let session_id = self.session_id();
                let link = self
                    .transport
                    .connect(&self.settings.endpoint, &session_id, self.signals.clone())
                    .await?;
                self.link = Some(link);
                Ok(None)
            }
            SessionEffect::StartEncoder => {
                let signal = self
                    .media
                    .clone()
                    .ok_or(DomainError::OutputSurfaceUnavailable)?;
                let session_id = self.session_id();
                self.encoder.start(
                    signal,
                    &self.settings.encoder,
                    &session_id,
                    self.signals.clone(),
                )?;
                Ok(None)
            }
            SessionEffect::StopEncoder => {
                if self.encoder.is_running() {
                    self.encoder.stop();
                    Ok(None)
                } else {
                    Ok(Some(SessionEvent::EncoderStopped))
                }
            }
            SessionEffect::CloseSocket => {
                if let Some(mut link) = self.link.take() {
                    link.close();
                }
                Ok(None)
            }
        }
    }

    fn session_id(&self) -> String {
        self.session.id().unwrap_or_default().to_string()
    }

    fn transition(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        let before = self.session.status();
        let effects = self.session.handle(event);
        let after = self.session.status();

        if before != after {
            let reason = self
                .session
                .last_transition()
                .and_then(|t| t.reason.clone())
                .unwrap_or_default();
            tracing::info!(
                from = %before,
                to = %after,
                reason = %reason,
                "Broadcast session transition"
            );
            self.on_status_changed(after);
        }

        effects
    }

    fn on_status_changed(&mut self, status: SessionStatus) {
        if status != SessionStatus::Connecting {
            if let Some(timer) = self.connect_timer.take() {
                timer.abort();
            }
        }

        self.metrics.report_state_change(&status);
        self.snapshots.send_replace(self.session.snapshot());

        if status == SessionStatus::Idle {
            for (reply, result) in self.pending_finish.drain(..) {
                let _ = reply.send(result);
            }
        }
    }

    fn arm_connect_timer(&mut self, session_id: String) {
        let Some(timeout) = self.settings.connect_timeout else {
            return;
        };
        let signals = self.signals.clone();
        self.connect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = signals.send(PipelineSignal::ConnectTimedOut { session_id });
        }));
    }

    async fn teardown(&mut self) {
        if self.session.status().is_active() {
            tracing::info!("Controller dropped with an active session, closing it");
            if let Err(e) = self.dispatch(SessionEvent::FinishRequested).await {
                tracing::warn!("Session close on shutdown failed: {}", e);
            }
            if let Err(e) = self.relay.terminate_server().await {
                tracing::warn!("Relay teardown failed: {}", e);
            }
        }
        if let Some(timer) = self.connect_timer.take() {
            timer.abort();
        }
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.encoder.stop();
    }
}

fn failure_event(effect: SessionEffect) -> Option<SessionEvent> {
    match effect {
        SessionEffect::OpenSocket => Some(SessionEvent::StartFailed),
        SessionEffect::StartEncoder | SessionEffect::StopEncoder => {
            Some(SessionEvent::EncoderStopped)
        }
        SessionEffect::CloseSocket => None,
    }
}
