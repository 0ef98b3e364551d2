//! Grove Protocol
//!
//! Shared vocabulary of the Grove canvas: colors, points, stages and the
//! JSON events exchanged between visitors and the relay.
//!
//! # Wire Format
//!
//! Every WebSocket text frame carries one adjacently tagged event:
//!
//! ```text
//! {"type": "pixelBroadcast", "data": {"x": 10.0, "y": 4.5, "color": [255, 99, 71], "size": 3.2, "ownerId": "s-1-9f2c"}}
//! ```
//!
//! Field names are camelCase and colors are `[r, g, b]` arrays. Payload
//! fields that a peer leaves out decode to inert defaults rather than
//! rejecting the whole frame.
//!
//! # Identity
//!
//! Visitors never get to decide who they are. The relay assigns a session id
//! and a palette color on connect and stamps both onto everything it
//! forwards.

mod color;
mod error;
mod event;
mod geometry;
mod stage;

pub use color::{Palette, Rgb, PALETTE};
pub use error::{Error, Result};
pub use event::{Assignment, ClientEvent, FlowerPayload, Mark, PixelPayload, ServerEvent, TelemetryPayload};
pub use geometry::Point;
pub use stage::Stage;

/// Opaque identifier of a connected session, assigned by the relay.
pub type SessionId = String;
