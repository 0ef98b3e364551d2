//! Grove Client
//!
//! Everything a visitor runs locally: the audio-driven particle pipeline
//! that settles marks, the store that merges local and relayed state, and
//! the link to the relay.
//!
//! # Architecture
//!
//! - **Pipeline**: spawns particles while the visitor is loud enough and
//!   turns the ones that settle into marks, up to a per-visitor cap
//! - **Store**: marks and flowers from every visitor, in arrival order
//! - **Target**: where the visitor's flower points its line
//! - **GardenClient**: one visitor's context object tying the above together
//! - **RelayLink**: WebSocket connection to a Grove relay
//!
//! The client is single threaded. Drive [`GardenClient::tick`] once per
//! frame and apply relay events between ticks.

mod audio;
mod client;
mod config;
mod context;
mod error;
mod link;
mod particle;
mod pipeline;
mod store;
mod target;
mod telemetry;

pub use audio::{level_from_waveform, AudioSource, FixedLevel, Permission, WaveformSource, WAVEFORM_LEN};
pub use client::GardenClient;
pub use config::PipelineConfig;
pub use context::{MarkBudget, SessionContext};
pub use error::{ClientError, Result};
pub use link::{LinkReceiver, LinkSender, RelayLink};
pub use particle::{Particle, ParticleArena};
pub use pipeline::EffectPipeline;
pub use store::{Avatar, ReconciliationStore};
pub use target::{default_anchors, Anchor, TargetSelector};
pub use telemetry::Throttle;
