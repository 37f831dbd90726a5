use async_trait::async_trait;

use crate::domain::errors::Result;
use crate::domain::value_objects::{Chunk, RelayEndpoint};

use super::SignalSender;

/// Port for the duplex connection to the relay
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin connecting. The returned link exists before the socket is open;
    /// `SocketOpened` and `SocketClosed` arrive later on `signals`, tagged
    /// with `session_id`.
    async fn connect(
        &self,
        endpoint: &RelayEndpoint,
        session_id: &str,
        signals: SignalSender,
    ) -> Result<Box<dyn TransportLink>>;
}

/// Outbound half of one connection
pub trait TransportLink: Send {
    /// Queue a chunk as one binary message
    fn send(&mut self, chunk: Chunk) -> Result<()>;

    /// Close the connection; closing twice is harmless
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}
