use crate::domain::errors::{DomainError, Result};

/// Default relay address; the relay process listens on loopback only
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:3000";

/// Local relay endpoint the transport dials once the relay is up
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEndpoint {
    url: String,
    host: String,
    port: u16,
}

impl RelayEndpoint {
    pub fn new(url: String) -> Result<Self> {
        let (host, port) = Self::parse_authority(&url)?;
        Ok(Self { url, host, port })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form used for the TCP readiness probe
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn parse_authority(url: &str) -> Result<(String, u16)> {
        let rest = url
            .strip_prefix("ws://")
            .ok_or_else(|| DomainError::InvalidRelayUrl(url.to_string()))?;

        let authority = rest.split('/').next().unwrap_or_default();
        if authority.is_empty() {
            return Err(DomainError::InvalidRelayUrl(url.to_string()));
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| DomainError::InvalidRelayUrl(url.to_string()))?;
                if port == 0 {
                    return Err(DomainError::InvalidPort);
                }
                if host.is_empty() {
                    return Err(DomainError::InvalidRelayUrl(url.to_string()));
                }
                Ok((host.to_string(), port))
            }
            None => Ok((authority.to_string(), 80)),
        }
    }
}

impl Default for RelayEndpoint {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}
