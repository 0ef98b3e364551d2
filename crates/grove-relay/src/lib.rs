//! Grove Relay
//!
//! One process that every visitor of the shared canvas connects to. It
//! remembers who is connected and which color each visitor was given, and
//! fans their marks, flowers and telemetry out to everyone else.
//!
//! # Architecture
//!
//! - **Registry**: active sessions, their colors and flowers
//! - **Hub**: single task owning the registry; every fan-out goes through it
//! - **Outbox**: bounded per-connection queue that drops its oldest frame when full
//! - **Server**: axum WebSocket endpoint at `/ws` plus `/api/status`
//!
//! Nothing is persisted. Restarting the relay forgets every session.
//!
//! # Usage
//!
//! ```no_run
//! use grove_relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::from_env()?;
//!     RelayServer::new(config).serve().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod hub;
mod outbox;
mod registry;
mod server;

pub use config::RelayConfig;
pub use error::{Error, Result};
pub use hub::{Fanout, Hub, HubCommand, HubHandle, HubStatus};
pub use outbox::{outbox, Frame, Outbox, OutboxReceiver};
pub use registry::{Registry, Session, SessionState};
pub use server::RelayServer;
