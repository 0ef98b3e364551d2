//! Grove relay binary
//!
//! Usage: `grove-relay [port]`. Everything else comes from `GROVE_*`
//! environment variables.

use grove_relay::{RelayConfig, RelayServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = RelayConfig::from_env()?;
    if let Some(port) = std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        config.listen_addr.set_port(port);
    }

    tracing::info!(
        addr = %config.listen_addr,
        outbox = config.outbox_capacity,
        idle_timeout = ?config.idle_timeout,
        "Starting Grove relay"
    );

    RelayServer::new(config).serve().await?;

    Ok(())
}
