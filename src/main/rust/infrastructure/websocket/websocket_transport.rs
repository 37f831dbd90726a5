use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{PipelineSignal, SignalSender, Transport, TransportLink};
use crate::domain::value_objects::{Chunk, RelayEndpoint};

enum Outbound {
    Chunk(Bytes),
    Close,
}

/// WebSocket client transport. Each chunk becomes one binary message.
///
/// `SocketClosed` is only posted when the peer goes away or the connection
/// fails; a locally requested close is silent.
#[derive(Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(
        &self,
        endpoint: &RelayEndpoint,
        session_id: &str,
        signals: SignalSender,
    ) -> Result<Box<dyn TransportLink>> {
        let url = endpoint.url().to_string();
        let request = url
            .as_str()
            .into_client_request()
            .map_err(|e| DomainError::TransportFailed(format!("{url}: {e}")))?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tracing::info!(url = %url, session_id = %session_id, "Connecting to relay");
        tokio::spawn(run_connection(
            url,
            request,
            session_id.to_string(),
            outbound_rx,
            signals,
        ));

        Ok(Box::new(WebSocketLink {
            outbound: outbound_tx,
            closed: false,
        }))
    }
}

pub struct WebSocketLink {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl TransportLink for WebSocketLink {
    fn send(&mut self, chunk: Chunk) -> Result<()> {
        if self.is_closed() {
            return Err(DomainError::TransportClosed);
        }
        self.outbound
            .send(Outbound::Chunk(chunk.into_data()))
            .map_err(|_| DomainError::TransportClosed)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.outbound.send(Outbound::Close);
    }

    fn is_closed(&self) -> bool {
        self.closed || self.outbound.is_closed()
    }
}

async fn run_connection(
    url: String,
    request: Request,
    session_id: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    signals: SignalSender,
) {
    let closed = || PipelineSignal::SocketClosed {
        session_id: session_id.clone(),
    };

    let connect = tokio_tungstenite::connect_async(request);
    tokio::pin!(connect);

    // chunks queued before the handshake completes go out right after it
    let mut queued: Vec<Bytes> = Vec::new();
    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    tracing::warn!(url = %url, "Relay connection failed: {}", e);
                    let _ = signals.send(closed());
                    return;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Chunk(data)) => queued.push(data),
                Some(Outbound::Close) | None => {
                    tracing::debug!("Relay connection abandoned before open");
                    return;
                }
            },
        }
    };

    tracing::info!(url = %url, "Relay socket opened");
    let _ = signals.send(PipelineSignal::SocketOpened {
        session_id: session_id.clone(),
    });

    let (mut write, mut read) = stream.split();

    for data in queued.drain(..) {
        if let Err(e) = write.send(Message::Binary(data.to_vec())).await {
            tracing::warn!("Relay write failed: {}", e);
            let _ = signals.send(closed());
            return;
        }
    }

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Chunk(data)) => {
                    if let Err(e) = write.send(Message::Binary(data.to_vec())).await {
                        tracing::warn!("Relay write failed: {}", e);
                        let _ = signals.send(closed());
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = write.close().await;
                    tracing::info!("Relay socket closed");
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Relay closed the socket: {:?}", frame);
                    let _ = signals.send(closed());
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Relay socket error: {}", e);
                    let _ = signals.send(closed());
                    return;
                }
                None => {
                    tracing::info!("Relay socket ended");
                    let _ = signals.send(closed());
                    return;
                }
            },
        }
    }
}
