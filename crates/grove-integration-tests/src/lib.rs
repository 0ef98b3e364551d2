//! Harness for end-to-end tests against a relay on a loopback port.

use std::net::SocketAddr;
use std::time::Duration;

use grove_client::{ClientError, RelayLink};
use grove_protocol::ServerEvent;
use grove_relay::{HubHandle, RelayConfig, RelayServer};
use tokio::net::TcpListener;

/// Upper bound for any single wait in a test.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A relay serving on an ephemeral loopback port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub hub: HubHandle,
}

impl TestRelay {
    pub async fn start(config: RelayConfig) -> grove_relay::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = RelayServer::new(config);
        let hub = server.hub();
        tokio::spawn(server.serve_on(listener));
        Ok(Self { addr, hub })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn connect(&self) -> Result<RelayLink, ClientError> {
        RelayLink::connect(&self.url()).await
    }
}

/// Errors a wait on the relay can end with.
#[derive(Debug)]
pub enum WaitError {
    TimedOut,
    Closed,
    Client(ClientError),
}

impl From<ClientError> for WaitError {
    fn from(e: ClientError) -> Self {
        WaitError::Client(e)
    }
}

/// Next event on `link`, failing after [`TIMEOUT`].
pub async fn next_event(link: &mut RelayLink) -> Result<ServerEvent, WaitError> {
    match tokio::time::timeout(TIMEOUT, link.recv()).await {
        Ok(Ok(Some(event))) => Ok(event),
        Ok(Ok(None)) => Err(WaitError::Closed),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(WaitError::TimedOut),
    }
}

/// Feed events from `link` to `apply` until it returns `true`.
pub async fn pump_until<F>(link: &mut RelayLink, mut apply: F) -> Result<(), WaitError>
where
    F: FnMut(ServerEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let event = match tokio::time::timeout_at(deadline, link.recv()).await {
            Ok(Ok(Some(event))) => event,
            Ok(Ok(None)) => return Err(WaitError::Closed),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(WaitError::TimedOut),
        };
        if apply(event) {
            return Ok(());
        }
    }
}
