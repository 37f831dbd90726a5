use std::sync::Mutex;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::RelayProcess;
use crate::domain::value_objects::{BackoffPolicy, RelayEndpoint};

/// Relay that runs beside this process and listens on a loopback port.
///
/// Starting it needs a stream key and means waiting until the port accepts
/// TCP connections; the key is held until the relay is torn down.
pub struct LoopbackRelay {
    endpoint: RelayEndpoint,
    backoff: BackoffPolicy,
    stream_key: Mutex<Option<String>>,
}

impl LoopbackRelay {
    pub fn new(endpoint: RelayEndpoint, backoff: BackoffPolicy) -> Self {
        Self {
            endpoint,
            backoff,
            stream_key: Mutex::new(None),
        }
    }

    /// Key handed over by the last `send_stream_key`, until termination
    #[cfg(test)]
    fn stream_key(&self) -> Option<String> {
        self.stream_key.lock().ok().and_then(|key| key.clone())
    }
}

#[async_trait]
impl RelayProcess for LoopbackRelay {
    fn send_stream_key(&self, key: &str) {
        if let Ok(mut slot) = self.stream_key.lock() {
            *slot = Some(key.to_string());
        }
        // the key itself is a credential and stays out of the logs
        tracing::info!(key_len = key.len(), "Stream key handed to relay");
    }

    async fn start_server(&self) -> Result<()> {
        let has_key = self
            .stream_key
            .lock()
            .map(|key| key.is_some())
            .unwrap_or(false);
        if !has_key {
            return Err(DomainError::RelayUnavailable(
                "no stream key handed over".to_string(),
            ));
        }

        let address = self.endpoint.socket_address();
        let mut delays = self.backoff.delays();
        let mut attempt = 1u32;

        loop {
            match TcpStream::connect(&address).await {
                Ok(_) => {
                    tracing::info!(address = %address, attempt, "Relay is accepting connections");
                    return Ok(());
                }
                Err(e) => match delays.next() {
                    Some(delay) => {
                        tracing::debug!(
                            "Relay not ready at {} ({}), retrying in {:?} (attempt {})",
                            address,
                            e,
                            delay,
                            attempt
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(
                            "Relay did not come up at {} after {} attempts",
                            address,
                            attempt
                        );
                        return Err(DomainError::RelayUnavailable(format!(
                            "{} after {} attempts: {}",
                            address, attempt, e
                        )));
                    }
                },
            }
            attempt += 1;
        }
    }

    async fn terminate_server(&self) -> Result<()> {
        if let Ok(mut slot) = self.stream_key.lock() {
            *slot = None;
        }
        tracing::info!("Relay released");
        Ok(())
    }
}
