// Protocol strategies: one implementation of "get status" / "send action"
// per dialect family.

mod http;
mod tcp;

pub use http::HttpStrategy;
pub use tcp::{TcpIdentity, TcpStrategy};

use crate::Payload;
use crate::dialect::{DialectDefinition, Endpoint, HostEndpoint};
use crate::error::Error;
use crate::transport::TransportConfig;

/// The transport bound to one device and one dialect family.
#[derive(Debug)]
pub enum Strategy {
    Http(HttpStrategy),
    Tcp(TcpStrategy),
}

impl Strategy {
    /// Build the strategy a dialect calls for. `client` is shared with HTTP
    /// strategies when given; the TCP strategy never pools connections.
    pub fn for_dialect(
        dialect: &DialectDefinition,
        endpoint: HostEndpoint,
        transport: &TransportConfig,
        client: Option<&reqwest::Client>,
    ) -> Result<Self, Error> {
        if dialect.version.is_raw_tcp() {
            return Ok(Self::Tcp(TcpStrategy::new(endpoint, transport)));
        }
        let http = match client {
            Some(client) => HttpStrategy::with_client(endpoint, client.clone(), transport)?,
            None => HttpStrategy::new(endpoint, transport)?,
        };
        Ok(Self::Http(http))
    }

    pub fn endpoint(&self) -> &HostEndpoint {
        match self {
            Self::Http(s) => s.endpoint(),
            Self::Tcp(s) => s.endpoint(),
        }
    }

    pub async fn get_status(&self, endpoint: Endpoint) -> Result<Option<Payload>, Error> {
        match self {
            Self::Http(s) => s.get_status(endpoint).await,
            Self::Tcp(s) => s.get_status(endpoint).await,
        }
    }

    pub async fn send_action(
        &self,
        endpoint: Endpoint,
        body: &Payload,
    ) -> Result<Option<Payload>, Error> {
        match self {
            Self::Http(s) => s.send_action(endpoint, body).await,
            Self::Tcp(s) => s.send_action(endpoint, body).await,
        }
    }

    /// Identity echoed by the TCP dialect; `None` for HTTP strategies.
    pub fn tcp_identity(&self) -> Option<&TcpIdentity> {
        match self {
            Self::Tcp(s) => Some(s.identity()),
            Self::Http(_) => None,
        }
    }

    /// Set the TCP identity. No-op for HTTP strategies, which send none.
    pub fn set_tcp_identity(&mut self, identity: TcpIdentity) {
        if let Self::Tcp(s) = self {
            s.set_identity(identity);
        }
    }
}
