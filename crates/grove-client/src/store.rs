//! Reconciliation store: everything the renderer should draw.
//!
//! Local settlements and relay events land in the same collections. Marks
//! only ever accumulate; avatars come and go with their owners' sessions.

use grove_protocol::{FlowerPayload, Mark, Point, ServerEvent, SessionId, Stage, TelemetryPayload};
use serde::Serialize;
use tracing::{debug, trace};

/// A visitor's flower.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub owner_id: SessionId,
    pub x: f32,
    pub y: f32,
    pub visual_token: String,
    pub stage: Stage,
    pub has_line: bool,
    pub line_target: Point,
    pub audio_level: f32,
}

impl Avatar {
    pub fn from_flower(flower: &FlowerPayload) -> Self {
        Self {
            owner_id: flower.id.clone(),
            x: flower.x,
            y: flower.y,
            visual_token: flower.visual_token.clone(),
            stage: flower.stage,
            has_line: false,
            line_target: Point::default(),
            audio_level: 0.0,
        }
    }

    pub fn to_flower(&self) -> FlowerPayload {
        FlowerPayload {
            id: self.owner_id.clone(),
            x: self.x,
            y: self.y,
            visual_token: self.visual_token.clone(),
            stage: self.stage,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn apply_telemetry(&mut self, telemetry: &TelemetryPayload) {
        self.has_line = telemetry.has_line;
        self.audio_level = telemetry.level;
        self.line_target = telemetry.line_target;
    }
}

/// Local view of all marks and avatars, own and remote.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationStore {
    self_id: Option<SessionId>,
    marks: Vec<Mark>,
    avatars: Vec<Avatar>,
    own: Option<Avatar>,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id used to recognize our own echoes.
    pub fn set_self_id(&mut self, id: &str) {
        self.self_id = Some(id.to_string());
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Append a mark that settled locally.
    pub fn record_local_mark(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    /// Install our own avatar. Returns `false` if one already exists.
    pub fn set_own_avatar(&mut self, avatar: Avatar) -> bool {
        if self.own.is_some() {
            return false;
        }
        self.own = Some(avatar);
        true
    }

    pub fn own_avatar_mut(&mut self) -> Option<&mut Avatar> {
        self.own.as_mut()
    }

    /// Apply an event delivered by the relay.
    pub fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::AssignColor(assignment) => {
                if self.self_id.is_none() {
                    self.set_self_id(&assignment.session_id);
                }
            }
            ServerEvent::PixelBroadcast(mark) => {
                self.apply_mark(mark);
            }
            ServerEvent::FlowerBroadcast(flower) => {
                self.apply_flower(flower);
            }
            ServerEvent::UserDisconnected(id) => self.apply_disconnect(id),
            ServerEvent::AudioActivityBroadcast(telemetry) => {
                self.apply_telemetry(telemetry);
            }
        }
    }

    /// Append a remote mark as delivered. Marks without a positive size or
    /// with non-finite coordinates are dropped.
    pub fn apply_mark(&mut self, mark: &Mark) -> bool {
        if !mark.is_drawable() {
            debug!(owner = %mark.owner_id, size = mark.size, "dropping mark that cannot be drawn");
            return false;
        }
        self.marks.push(mark.clone());
        true
    }

    /// Add a remote avatar. Our own echo and repeats for an owner we
    /// already show are ignored.
    pub fn apply_flower(&mut self, flower: &FlowerPayload) -> bool {
        if self.self_id.as_deref() == Some(flower.id.as_str()) {
            trace!("ignoring own flower echo");
            return false;
        }
        if self.avatar_of(&flower.id).is_some() {
            debug!(owner = %flower.id, "avatar already known");
            return false;
        }
        self.avatars.push(Avatar::from_flower(flower));
        true
    }

    /// Drop every avatar owned by `id`. Marks stay.
    pub fn apply_disconnect(&mut self, id: &str) {
        self.avatars.retain(|a| a.owner_id != id);
        if self.own.as_ref().is_some_and(|a| a.owner_id == id) {
            self.own = None;
        }
    }

    /// Update the matching avatar's telemetry. Telemetry for an avatar we
    /// have not seen yet is dropped.
    pub fn apply_telemetry(&mut self, telemetry: &TelemetryPayload) -> bool {
        match self.avatars.iter_mut().find(|a| a.owner_id == telemetry.id) {
            Some(avatar) => {
                avatar.apply_telemetry(telemetry);
                true
            }
            None => {
                trace!(owner = %telemetry.id, "telemetry for unknown avatar dropped");
                false
            }
        }
    }

    pub fn all_marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Remote avatars, in arrival order.
    pub fn all_avatars(&self) -> &[Avatar] {
        &self.avatars
    }

    pub fn own_avatar(&self) -> Option<&Avatar> {
        self.own.as_ref()
    }

    pub fn avatar_of(&self, owner: &str) -> Option<&Avatar> {
        self.avatars.iter().find(|a| a.owner_id == owner)
    }

    pub fn marks_owned_by(&self, owner: &str) -> usize {
        self.marks.iter().filter(|m| m.owner_id == owner).count()
    }
}
