use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use pipeline_vcast::{
    BroadcastController, BroadcastSettings, Chunk, DomainError, Encoder, EncoderConfig,
    MediaSignal, MetricsReporter, PipelineSignal, RelayEndpoint, RelayProcess, Result,
    SessionSnapshot, SessionStatus, SignalSender, StageFrame, Transport, TransportLink,
};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct LinkState {
    sent: Vec<u64>,
    closed: bool,
}

/// Transport that records dials and lets the test play the relay's side
#[derive(Clone, Default)]
struct FakeTransport {
    log: Log,
    auto_open: bool,
    fail_connect: bool,
    dials: Arc<Mutex<Vec<(String, SignalSender)>>>,
    link: Arc<Mutex<LinkState>>,
}

impl FakeTransport {
    /// Session id and signal queue handed to the `index`th dial
    fn dial(&self, index: usize) -> (String, SignalSender) {
        self.dials.lock().unwrap()[index].clone()
    }

    fn latest_dial(&self) -> (String, SignalSender) {
        self.dials.lock().unwrap().last().cloned().unwrap()
    }

    fn peer_open(&self) {
        let (session_id, signals) = self.latest_dial();
        signals.send(PipelineSignal::SocketOpened { session_id }).unwrap();
    }

    fn peer_close(&self) {
        let (session_id, signals) = self.latest_dial();
        signals.send(PipelineSignal::SocketClosed { session_id }).unwrap();
    }

    fn sent(&self) -> Vec<u64> {
        self.link.lock().unwrap().sent.clone()
    }

    fn closed(&self) -> bool {
        self.link.lock().unwrap().closed
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(
        &self,
        _endpoint: &RelayEndpoint,
        session_id: &str,
        signals: SignalSender,
    ) -> Result<Box<dyn TransportLink>> {
        self.log.lock().unwrap().push("connect".to_string());
        if self.fail_connect {
            return Err(DomainError::TransportFailed("unreachable".to_string()));
        }
        *self.link.lock().unwrap() = LinkState::default();
        if self.auto_open {
            signals
                .send(PipelineSignal::SocketOpened {
                    session_id: session_id.to_string(),
                })
                .unwrap();
        }
        self.dials
            .lock()
            .unwrap()
            .push((session_id.to_string(), signals));
        Ok(Box::new(FakeLink {
            state: self.link.clone(),
        }))
    }
}

struct FakeLink {
    state: Arc<Mutex<LinkState>>,
}

impl TransportLink for FakeLink {
    fn send(&mut self, chunk: Chunk) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(DomainError::TransportClosed);
        }
        state.sent.push(chunk.sequence());
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed = true;
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[derive(Default)]
struct EncoderState {
    sink: Option<SignalSender>,
    session_id: String,
    running: bool,
    next_sequence: u64,
    starts: u32,
    stops: u32,
}

/// Encoder whose chunks are produced on demand by the test
#[derive(Clone, Default)]
struct FakeEncoder {
    state: Arc<Mutex<EncoderState>>,
}

impl FakeEncoder {
    fn emit(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            let chunk = Chunk::new(state.next_sequence, Bytes::from_static(b"webm"));
            state.next_sequence += 1;
            state
                .sink
                .as_ref()
                .unwrap()
                .send(PipelineSignal::Chunk(chunk))
                .unwrap();
        }
    }

    fn running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    fn stops(&self) -> u32 {
        self.state.lock().unwrap().stops
    }

    fn starts(&self) -> u32 {
        self.state.lock().unwrap().starts
    }
}

impl Encoder for FakeEncoder {
    fn start(
        &mut self,
        _signal: MediaSignal,
        _config: &EncoderConfig,
        session_id: &str,
        sink: SignalSender,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.running {
            return Err(DomainError::EncoderAlreadyRunning);
        }
        state.running = true;
        state.starts += 1;
        state.next_sequence = 0;
        state.sink = Some(sink);
        state.session_id = session_id.to_string();
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if !state.running {
            return;
        }
        state.running = false;
        state.stops += 1;
        let sink = state.sink.take().unwrap();
        // flushed tail of the last slice
        let tail = Chunk::new(state.next_sequence, Bytes::from_static(b"tail"));
        sink.send(PipelineSignal::Chunk(tail)).unwrap();
        sink.send(PipelineSignal::EncoderStopped {
            session_id: state.session_id.clone(),
        })
        .unwrap();
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

#[derive(Clone, Default)]
struct FakeRelay {
    log: Log,
    fail_start: bool,
}

#[async_trait]
impl RelayProcess for FakeRelay {
    fn send_stream_key(&self, key: &str) {
        self.log.lock().unwrap().push(format!("key:{key}"));
    }

    async fn start_server(&self) -> Result<()> {
        self.log.lock().unwrap().push("start_server".to_string());
        if self.fail_start {
            return Err(DomainError::RelayUnavailable("not listening".to_string()));
        }
        Ok(())
    }

    async fn terminate_server(&self) -> Result<()> {
        self.log.lock().unwrap().push("terminate_server".to_string());
        Ok(())
    }
}

struct NullMetrics;

impl MetricsReporter for NullMetrics {
    fn report_state_change(&self, _status: &SessionStatus) {}
    fn report_chunk_sent(&self, _bytes: usize) {}
    fn report_chunk_dropped(&self) {}
    fn report_frame_composited(&self) {}
    fn report_uptime(&self, _uptime_secs: f64) {}
}

struct Harness {
    controller: BroadcastController,
    transport: FakeTransport,
    encoder: FakeEncoder,
    log: Log,
    _frames: watch::Sender<Option<StageFrame>>,
}

impl Harness {
    fn new(auto_open: bool, fail_relay: bool, connect_timeout: Option<Duration>) -> Self {
        let log = Log::default();
        let transport = FakeTransport {
            log: log.clone(),
            auto_open,
            ..Default::default()
        };
        let encoder = FakeEncoder::default();
        let relay = FakeRelay {
            log: log.clone(),
            fail_start: fail_relay,
        };

        let settings = BroadcastSettings {
            connect_timeout,
            ..Default::default()
        };
        let controller = BroadcastController::spawn(
            Box::new(encoder.clone()),
            Box::new(transport.clone()),
            Arc::new(relay),
            Arc::new(NullMetrics),
            settings,
        );

        let (frames, rx) = watch::channel(None);
        controller.set_media_source(MediaSignal::new(rx, 30, 16, 9).unwrap());

        Self {
            controller,
            transport,
            encoder,
            log,
            _frames: frames,
        }
    }

    fn streaming() -> Self {
        Self::new(true, false, None)
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    async fn wait_for_status(&self, status: SessionStatus) {
        let mut rx = self.controller.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s: &SessionSnapshot| s.status == status),
        )
        .await
        .expect("status reached in time")
        .expect("controller alive");
    }

    async fn wait_for_sent(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.transport.sent().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("chunks forwarded in time");
    }
}

#[tokio::test]
async fn test_chunks_flow_in_order_then_finish_converges() {
    let harness = Harness::streaming();

    harness.controller.start_streaming("abc").await.unwrap();
    harness.wait_for_status(SessionStatus::Streaming).await;
    assert!(harness.controller.broadcast_time().is_some());

    harness.encoder.emit(3);
    harness.wait_for_sent(3).await;

    harness.controller.finish_streaming().await.unwrap();

    assert_eq!(harness.controller.status(), SessionStatus::Idle);
    assert!(harness.transport.closed());
    assert!(!harness.encoder.running());
    assert_eq!(harness.encoder.stops(), 1);
    // the flushed tail arrives after closing began and is not forwarded
    assert_eq!(harness.transport.sent(), vec![0, 1, 2]);
    assert!(harness.controller.broadcast_time().is_none());
    assert_eq!(harness.log().last().map(String::as_str), Some("terminate_server"));
}

#[tokio::test]
async fn test_peer_close_converges_to_idle() {
    let harness = Harness::streaming();

    harness.controller.start_streaming("abc").await.unwrap();
    harness.wait_for_status(SessionStatus::Streaming).await;
    harness.encoder.emit(2);
    harness.wait_for_sent(2).await;

    harness.transport.peer_close();
    harness.wait_for_status(SessionStatus::Idle).await;

    assert!(harness.transport.closed());
    assert!(!harness.encoder.running());
    assert_eq!(harness.encoder.stops(), 1);
    assert_eq!(harness.transport.sent(), vec![0, 1]);

    harness.controller.finish_streaming().await.unwrap();
    assert_eq!(harness.controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_finish_while_idle_is_noop() {
    let harness = Harness::streaming();

    harness.controller.finish_streaming().await.unwrap();

    assert_eq!(harness.controller.status(), SessionStatus::Idle);
    assert_eq!(harness.log(), vec!["terminate_server".to_string()]);
}

#[tokio::test]
async fn test_start_without_media_is_noop() {
    let log = Log::default();
    let controller = BroadcastController::spawn(
        Box::new(FakeEncoder::default()),
        Box::new(FakeTransport {
            log: log.clone(),
            auto_open: true,
            ..Default::default()
        }),
        Arc::new(FakeRelay {
            log: log.clone(),
            fail_start: false,
        }),
        Arc::new(NullMetrics),
        BroadcastSettings::default(),
    );

    controller.start_streaming("abc").await.unwrap();

    assert_eq!(controller.status(), SessionStatus::Idle);
    assert!(log.lock().unwrap().is_empty());
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_relay_is_ready_before_socket_is_dialed() {
    let harness = Harness::new(false, false, None);

    harness.controller.start_streaming("secret").await.unwrap();

    assert_eq!(harness.controller.status(), SessionStatus::Connecting);
    assert_eq!(
        harness.log(),
        vec![
            "key:secret".to_string(),
            "start_server".to_string(),
            "connect".to_string()
        ]
    );
}

#[tokio::test]
async fn test_start_while_active_is_rejected() {
    let harness = Harness::new(false, false, None);

    harness.controller.start_streaming("abc").await.unwrap();
    let second = harness.controller.start_streaming("abc").await;

    assert!(matches!(second, Err(DomainError::SessionActive(_))));
    assert_eq!(harness.controller.status(), SessionStatus::Connecting);
}

#[tokio::test]
async fn test_relay_failure_fails_session() {
    let harness = Harness::new(true, true, None);

    let result = harness.controller.start_streaming("abc").await;

    assert!(matches!(result, Err(DomainError::RelayUnavailable(_))));
    assert_eq!(harness.controller.status(), SessionStatus::Failed);
    assert!(!harness.log().contains(&"connect".to_string()));

    harness.controller.finish_streaming().await.unwrap();
    assert_eq!(harness.controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_connect_timeout_fails_session_and_allows_restart() {
    let harness = Harness::new(false, false, Some(Duration::from_millis(50)));

    harness.controller.start_streaming("abc").await.unwrap();
    harness.wait_for_status(SessionStatus::Failed).await;
    assert!(harness.transport.closed());
    assert!(!harness.encoder.running());

    harness.controller.start_streaming("abc").await.unwrap();
    assert_eq!(harness.controller.status(), SessionStatus::Connecting);
}

#[tokio::test]
async fn test_socket_closed_before_open_fails_session() {
    let harness = Harness::new(false, false, None);

    harness.controller.start_streaming("abc").await.unwrap();
    harness.transport.peer_close();
    harness.wait_for_status(SessionStatus::Failed).await;

    assert!(harness.transport.closed());
    assert_eq!(harness.encoder.stops(), 0);
}

#[tokio::test]
async fn test_shutdown_closes_active_session() {
    let harness = Harness::streaming();

    harness.controller.start_streaming("abc").await.unwrap();
    harness.wait_for_status(SessionStatus::Streaming).await;

    let Harness {
        controller,
        transport,
        encoder,
        log,
        _frames,
    } = harness;
    controller.shutdown().await.unwrap();

    assert!(transport.closed());
    assert!(!encoder.running());
    assert!(log.lock().unwrap().contains(&"terminate_server".to_string()));
}

#[tokio::test]
async fn test_previous_session_open_does_not_start_next_session() {
    let harness = Harness::new(false, false, None);

    harness.controller.start_streaming("abc").await.unwrap();
    harness.controller.finish_streaming().await.unwrap();
    harness.controller.start_streaming("abc").await.unwrap();
    assert_eq!(harness.controller.status(), SessionStatus::Connecting);

    let (first_id, first_signals) = harness.transport.dial(0);
    let (second_id, _) = harness.transport.dial(1);
    assert_ne!(first_id, second_id);

    // a late open from the finished session, then the real socket fails
    first_signals
        .send(PipelineSignal::SocketOpened { session_id: first_id })
        .unwrap();
    harness.transport.peer_close();
    harness.wait_for_status(SessionStatus::Failed).await;

    assert_eq!(harness.encoder.starts(), 0);
}

#[tokio::test]
async fn test_previous_session_close_does_not_fail_next_session() {
    let harness = Harness::new(false, false, None);

    harness.controller.start_streaming("abc").await.unwrap();
    harness.controller.finish_streaming().await.unwrap();
    harness.controller.start_streaming("abc").await.unwrap();

    let (first_id, first_signals) = harness.transport.dial(0);
    first_signals
        .send(PipelineSignal::SocketClosed {
            session_id: first_id.clone(),
        })
        .unwrap();
    first_signals
        .send(PipelineSignal::EncoderStopped { session_id: first_id })
        .unwrap();
    harness.transport.peer_open();
    harness.wait_for_status(SessionStatus::Streaming).await;

    assert!(!harness.transport.closed());
    assert_eq!(harness.encoder.starts(), 1);

    harness.encoder.emit(1);
    harness.wait_for_sent(1).await;
    harness.controller.finish_streaming().await.unwrap();
    assert_eq!(harness.controller.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn test_transport_failure_fails_session() {
    let log = Log::default();
    let encoder = FakeEncoder::default();
    let controller = BroadcastController::spawn(
        Box::new(encoder.clone()),
        Box::new(FakeTransport {
            log: log.clone(),
            fail_connect: true,
            ..Default::default()
        }),
        Arc::new(FakeRelay {
            log: log.clone(),
            fail_start: false,
        }),
        Arc::new(NullMetrics),
        BroadcastSettings::default(),
    );
    let (_frames, rx) = watch::channel(None);
    controller.set_media_source(MediaSignal::new(rx, 30, 16, 9).unwrap());

    let result = controller.start_streaming("abc").await;

    assert!(matches!(result, Err(DomainError::TransportFailed(_))));
    assert_eq!(controller.status(), SessionStatus::Failed);
    assert_eq!(encoder.starts(), 0);

    controller.finish_streaming().await.unwrap();
    assert_eq!(controller.status(), SessionStatus::Idle);
}
