use async_trait::async_trait;

use crate::domain::errors::Result;

/// Port for the local relay process that forwards the stream onward
#[async_trait]
pub trait RelayProcess: Send + Sync {
    /// Hand the broadcast credential to the relay before it starts
    fn send_stream_key(&self, key: &str);

    /// Resolve once the relay accepts connections
    async fn start_server(&self) -> Result<()>;

    /// Resolve once the relay has been torn down
    async fn terminate_server(&self) -> Result<()>;
}
