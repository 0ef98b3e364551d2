//! Events exchanged between visitors and the relay.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{Point, Rgb, SessionId, Stage};

/// Identity handed to a session right after it connects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assignment {
    pub session_id: SessionId,
    pub color: Rgb,
}

/// A settled mark as announced by its owner.
///
/// `owner_id` and `color` are advisory: the relay replaces both with the
/// sender's registered identity before forwarding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PixelPayload {
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub size: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<SessionId>,
}

impl PixelPayload {
    /// Whether this pixel can become a mark: a positive size and finite
    /// coordinates.
    pub fn is_drawable(&self) -> bool {
        drawable(self.x, self.y, self.size)
    }

    /// Attach the sender's authoritative identity.
    pub fn stamp(self, owner_id: &str, color: Rgb) -> Mark {
        Mark {
            x: self.x,
            y: self.y,
            color,
            size: self.size,
            owner_id: owner_id.to_string(),
        }
    }
}

/// A permanent, owner-attributed point on the canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Mark {
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub size: f32,
    pub owner_id: SessionId,
}

impl Mark {
    /// Whether the mark has a positive size and finite coordinates.
    pub fn is_drawable(&self) -> bool {
        drawable(self.x, self.y, self.size)
    }

    /// The announcement a client sends for one of its own marks.
    pub fn to_pixel(&self) -> PixelPayload {
        PixelPayload {
            x: self.x,
            y: self.y,
            color: self.color,
            size: self.size,
            owner_id: Some(self.owner_id.clone()),
        }
    }
}

fn drawable(x: f32, y: f32, size: f32) -> bool {
    x.is_finite() && y.is_finite() && size.is_finite() && size > 0.0
}

/// Creation of a visitor's flower.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowerPayload {
    pub id: SessionId,
    pub x: f32,
    pub y: f32,
    pub visual_token: String,
    pub stage: Stage,
}

/// Latest audio level and line target of a visitor's flower.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TelemetryPayload {
    pub id: SessionId,
    pub level: f32,
    pub has_line: bool,
    pub line_target: Point,
}

/// Events a visitor sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// A particle settled into a mark.
    NewPixel(PixelPayload),
    /// The visitor's flower appeared.
    NewFlower(FlowerPayload),
    /// Throttled audio telemetry.
    AudioActivity(TelemetryPayload),
}

impl ClientEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::NewPixel(_) => "newPixel",
            ClientEvent::NewFlower(_) => "newFlower",
            ClientEvent::AudioActivity(_) => "audioActivity",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Events the relay sends to visitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent once, to the new session only.
    AssignColor(Assignment),
    /// Another visitor's mark.
    PixelBroadcast(Mark),
    /// A visitor's flower, including the receiver's own echo.
    FlowerBroadcast(FlowerPayload),
    /// The session with this id is gone.
    UserDisconnected(SessionId),
    /// Another visitor's telemetry.
    AudioActivityBroadcast(TelemetryPayload),
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AssignColor(_) => "assignColor",
            ServerEvent::PixelBroadcast(_) => "pixelBroadcast",
            ServerEvent::FlowerBroadcast(_) => "flowerBroadcast",
            ServerEvent::UserDisconnected(_) => "userDisconnected",
            ServerEvent::AudioActivityBroadcast(_) => "audioActivityBroadcast",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
