//! Relay configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for a relay process.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// HTTP/WebSocket listen address
    pub listen_addr: SocketAddr,

    /// Frames buffered per connection before the oldest is dropped
    pub outbox_capacity: usize,

    /// Disconnect a session after this long without an inbound frame.
    /// `None` disables the timeout.
    pub idle_timeout: Option<Duration>,

    /// Ping each session this often so quiet but healthy peers keep
    /// producing pongs. Should be well below `idle_timeout`. `None`
    /// disables pings.
    pub ping_interval: Option<Duration>,

    /// Send existing flowers to sessions that join late
    pub replay_avatars: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            outbox_capacity: 256,
            idle_timeout: Some(Duration::from_secs(120)),
            ping_interval: Some(Duration::from_secs(30)),
            replay_avatars: true,
        }
    }
}

impl RelayConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// - `GROVE_LISTEN_ADDR` (default `0.0.0.0:3000`)
    /// - `GROVE_OUTBOX_CAPACITY` (default `256`)
    /// - `GROVE_IDLE_TIMEOUT_SECS` (default `120`, `0` disables)
    /// - `GROVE_PING_INTERVAL_SECS` (default `30`, `0` disables)
    /// - `GROVE_REPLAY_AVATARS` (default `true`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("GROVE_LISTEN_ADDR") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("GROVE_LISTEN_ADDR: {raw:?} is not a socket address")))?,
            None => defaults.listen_addr,
        };

        let outbox_capacity = match lookup("GROVE_OUTBOX_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "GROVE_OUTBOX_CAPACITY: {raw:?} is not a positive integer"
                    )))
                }
            },
            None => defaults.outbox_capacity,
        };

        let idle_timeout = match lookup("GROVE_IDLE_TIMEOUT_SECS") {
            Some(raw) => optional_secs("GROVE_IDLE_TIMEOUT_SECS", &raw)?,
            None => defaults.idle_timeout,
        };

        let ping_interval = match lookup("GROVE_PING_INTERVAL_SECS") {
            Some(raw) => optional_secs("GROVE_PING_INTERVAL_SECS", &raw)?,
            None => defaults.ping_interval,
        };

        let replay_avatars = match lookup("GROVE_REPLAY_AVATARS") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(Error::Config(format!(
                        "GROVE_REPLAY_AVATARS: {raw:?} is not a boolean"
                    )))
                }
            },
            None => defaults.replay_avatars,
        };

        Ok(Self {
            listen_addr,
            outbox_capacity,
            idle_timeout,
            ping_interval,
            replay_avatars,
        })
    }
}

/// Whole seconds, where `0` means disabled.
fn optional_secs(key: &str, raw: &str) -> Result<Option<Duration>> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: {raw:?} is not a number")))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
