//! One visitor, end to end.
//!
//! [`GardenClient`] ties the session context, effect pipeline, store and
//! target selection together. It performs no I/O: relay events go in through
//! [`GardenClient::apply`], and events for the relay pile up until
//! [`GardenClient::drain_outbound`] is called.

use std::collections::VecDeque;

use grove_protocol::{ClientEvent, Point, ServerEvent, Stage, TelemetryPayload};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::audio::Permission;
use crate::config::PipelineConfig;
use crate::context::SessionContext;
use crate::error::{ClientError, Result};
use crate::pipeline::EffectPipeline;
use crate::store::{Avatar, ReconciliationStore};
use crate::target::{default_anchors, Anchor, TargetSelector};
use crate::telemetry::Throttle;

/// Number of flower artworks a visitor can be given.
const FLOWER_VARIANTS: u32 = 5;

/// Per-visitor context object.
#[derive(Debug)]
pub struct GardenClient {
    config: PipelineConfig,
    ctx: SessionContext,
    pipeline: EffectPipeline,
    store: ReconciliationStore,
    anchors: Vec<Anchor>,
    throttle: Throttle,
    last_telemetry: Option<TelemetryPayload>,
    stop_countdown: Option<u32>,
    audio_granted: bool,
    outbound: VecDeque<ClientEvent>,
    ticks: u64,
}

impl GardenClient {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic client for tests and replays.
    pub fn with_seed(config: PipelineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: PipelineConfig, rng: StdRng) -> Self {
        let anchors = default_anchors(config.canvas_width, config.canvas_height);
        Self {
            ctx: SessionContext::new(config.mark_cap, rng),
            pipeline: EffectPipeline::new(),
            store: ReconciliationStore::new(),
            anchors,
            throttle: Throttle::new(config.telemetry_every),
            last_telemetry: None,
            stop_countdown: None,
            audio_granted: false,
            outbound: VecDeque::new(),
            ticks: 0,
            config,
        }
    }

    /// Replace the trees a pointer can select.
    pub fn with_anchors(mut self, anchors: Vec<Anchor>) -> Self {
        self.anchors = anchors;
        self
    }

    /// Apply one event from the relay.
    pub fn apply(&mut self, event: ServerEvent) {
        if let ServerEvent::AssignColor(assignment) = &event {
            if self.ctx.assign(assignment.clone()) {
                info!(session = %assignment.session_id, color = ?assignment.color, "identity assigned");
            }
        }
        self.store.apply(&event);
    }

    /// Record the outcome of the microphone permission prompt.
    ///
    /// A denial leaves the visitor silent for good. A grant after the
    /// flower exists starts emission right away.
    pub fn request_audio(&mut self, permission: Permission) -> Result<()> {
        match permission {
            Permission::Granted => {
                self.audio_granted = true;
                if self.pipeline.source().is_none() {
                    if let Some(source) = self.store.own_avatar().map(Avatar::position) {
                        self.pipeline.start(source);
                    }
                }
                Ok(())
            }
            Permission::Denied => {
                self.audio_granted = false;
                self.pipeline.stop();
                Err(ClientError::PermissionDenied)
            }
        }
    }

    /// First interaction: plant the visitor's flower at `at`.
    ///
    /// The flower is created once; later gestures do nothing.
    pub fn gesture(&mut self, at: Point) -> Result<()> {
        let Some(owner) = self.ctx.session_id().map(str::to_string) else {
            return Err(ClientError::NotAssigned);
        };
        if self.store.own_avatar().is_some() {
            return Ok(());
        }

        let variant = self.ctx.rng.gen_range(1..=FLOWER_VARIANTS);
        let target = TargetSelector::place_off_canvas(
            &mut self.ctx.rng,
            self.config.canvas_width,
            self.config.canvas_height,
            self.config.edge_margin,
        );
        let avatar = Avatar {
            owner_id: owner,
            x: at.x,
            y: at.y,
            visual_token: format!("flower-{variant}"),
            stage: self.ctx.stage,
            has_line: true,
            line_target: target,
            audio_level: 0.0,
        };
        debug!(token = %avatar.visual_token, x = at.x, y = at.y, "planting flower");

        self.outbound.push_back(ClientEvent::NewFlower(avatar.to_flower()));
        self.store.set_own_avatar(avatar);

        if self.audio_granted {
            self.pipeline.start(at);
        }
        Ok(())
    }

    /// Pointer moved or clicked at `at`. Selecting a tree re-aims the line
    /// and schedules emission to stop.
    pub fn pointer(&mut self, at: Point) -> Option<usize> {
        let own = self.store.own_avatar_mut()?;
        let index = TargetSelector::select(at, &self.anchors, self.config.hit_radius)?;

        let anchor = &self.anchors[index];
        own.line_target = anchor.position;
        own.has_line = true;
        debug!(tree = %anchor.visual_token, "line attached to tree");

        if self.stop_countdown.is_none() {
            self.stop_countdown = Some(self.config.stop_delay_ticks);
        }
        Some(index)
    }

    /// Run one render tick at audio level `level`. Returns how many marks
    /// settled.
    ///
    /// Telemetry goes out on throttled ticks while emitting. Once silent, a
    /// throttled tick sends only if the level, line or target changed since
    /// the last update, so peers see the drop to zero and any later re-aim.
    pub fn tick(&mut self, level: f32) -> usize {
        self.ticks += 1;
        let level = if self.audio_granted { level.clamp(0.0, 1.0) } else { 0.0 };

        let marks = self.pipeline.tick(&mut self.ctx, &self.config, level);
        let settled = marks.len();
        for mark in marks {
            self.outbound.push_back(ClientEvent::NewPixel(mark.to_pixel()));
            self.store.record_local_mark(mark);
        }

        let emitting = self.pipeline.is_active();
        let ready = self.throttle.ready();
        if let Some(own) = self.store.own_avatar_mut() {
            own.audio_level = if emitting { level } else { 0.0 };
            if ready {
                let telemetry = TelemetryPayload {
                    id: own.owner_id.clone(),
                    level: own.audio_level,
                    has_line: own.has_line,
                    line_target: own.line_target,
                };
                // While silent, only changes go out.
                if emitting || self.last_telemetry.as_ref() != Some(&telemetry) {
                    self.outbound.push_back(ClientEvent::AudioActivity(telemetry.clone()));
                    self.last_telemetry = Some(telemetry);
                }
            }
        }

        if let Some(remaining) = self.stop_countdown {
            if remaining <= 1 {
                self.stop_countdown = None;
                self.pipeline.stop();
                debug!(ticks = self.ticks, "emission stopped");
            } else {
                self.stop_countdown = Some(remaining - 1);
            }
        }

        settled
    }

    /// Move on to the next stage. The last stage is terminal.
    pub fn advance_stage(&mut self) -> Stage {
        self.ctx.stage = self.ctx.stage.next();
        if let Some(own) = self.store.own_avatar_mut() {
            own.stage = self.ctx.stage;
        }
        self.ctx.stage
    }

    /// Take every event queued for the relay, oldest first.
    pub fn drain_outbound(&mut self) -> Vec<ClientEvent> {
        self.outbound.drain(..).collect()
    }

    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn session_id(&self) -> Option<&str> {
        self.ctx.session_id()
    }

    pub fn stage(&self) -> Stage {
        self.ctx.stage
    }

    pub fn is_emitting(&self) -> bool {
        self.pipeline.is_active()
    }

    /// Particles still in flight.
    pub fn live_particles(&self) -> usize {
        self.pipeline.particles().len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_protocol::{Assignment, Rgb};

    fn assigned(id: &str, seed: u64) -> GardenClient {
        let mut client = GardenClient::with_seed(PipelineConfig::default(), seed);
        client.apply(ServerEvent::AssignColor(Assignment {
            session_id: id.into(),
            color: Rgb(138, 43, 226),
        }));
        client
    }

    fn emitting(id: &str, seed: u64) -> GardenClient {
        let mut client = assigned(id, seed);
        client.request_audio(Permission::Granted).unwrap();
        client.gesture(Point::new(400.0, 300.0)).unwrap();
        client.drain_outbound();
        client
    }

    fn telemetry(events: Vec<ClientEvent>) -> Vec<TelemetryPayload> {
        events
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::AudioActivity(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// What the relay would forward for one of `sender`'s events.
    fn relayed(event: ClientEvent, sender: &str, color: Rgb) -> Option<ServerEvent> {
        match event {
            ClientEvent::NewPixel(pixel) => Some(ServerEvent::PixelBroadcast(pixel.stamp(sender, color))),
            ClientEvent::NewFlower(mut flower) => {
                flower.id = sender.to_string();
                Some(ServerEvent::FlowerBroadcast(flower))
            }
            ClientEvent::AudioActivity(_) => None,
        }
    }

    #[test]
    fn gesture_needs_an_identity() {
        let mut client = GardenClient::with_seed(PipelineConfig::default(), 1);
        assert!(matches!(
            client.gesture(Point::new(1.0, 1.0)),
            Err(ClientError::NotAssigned)
        ));
        assert!(client.drain_outbound().is_empty());
    }

    #[test]
    fn gesture_plants_one_flower() {
        let mut client = assigned("s-1-aa", 2);
        client.gesture(Point::new(100.0, 200.0)).unwrap();
        client.gesture(Point::new(300.0, 300.0)).unwrap();

        let out = client.drain_outbound();
        assert_eq!(out.len(), 1);
        match &out[0] {
            ClientEvent::NewFlower(flower) => {
                assert_eq!(flower.id, "s-1-aa");
                assert_eq!((flower.x, flower.y), (100.0, 200.0));
                assert!(flower.visual_token.starts_with("flower-"));
                assert_eq!(flower.stage, Stage::Infatuation);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let own = client.store().own_avatar().unwrap();
        assert!(own.has_line);
        let (w, h, m) = (1280.0, 720.0, 60.0);
        let t = own.line_target;
        assert!(t.x == -m || t.x == w + m || t.y == -m || t.y == h + m);
    }

    #[test]
    fn denied_audio_stays_silent() {
        let mut client = assigned("s-1-aa", 3);
        assert!(matches!(
            client.request_audio(Permission::Denied),
            Err(ClientError::PermissionDenied)
        ));
        client.gesture(Point::new(100.0, 200.0)).unwrap();
        client.drain_outbound();

        for _ in 0..1_000 {
            assert_eq!(client.tick(1.0), 0);
        }
        assert!(!client.is_emitting());

        let out = client.drain_outbound();
        assert!(!out.iter().any(|e| matches!(e, ClientEvent::NewPixel(_))));
        let levels: Vec<f32> = telemetry(out).iter().map(|t| t.level).collect();
        assert_eq!(levels, [0.0]);
    }

    #[test]
    fn late_grant_starts_emission_at_the_flower() {
        let mut client = assigned("s-1-aa", 4);
        client.gesture(Point::new(100.0, 200.0)).unwrap();
        assert!(!client.is_emitting());
        client.request_audio(Permission::Granted).unwrap();
        assert!(client.is_emitting());
    }

    #[test]
    fn telemetry_goes_out_every_third_tick() {
        let mut client = emitting("s-1-aa", 5);
        for _ in 0..9 {
            client.tick(0.5);
        }
        let sent = telemetry(client.drain_outbound());
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|t| t.id == "s-1-aa" && t.level == 0.5 && t.has_line));
    }

    #[test]
    fn silence_and_later_reaims_reach_peers() {
        let mut client = emitting("s-1-aa", 11);
        let first = client.anchors()[0].position;
        let last = client.anchors()[2].position;

        assert_eq!(client.pointer(first), Some(0));
        while client.is_emitting() {
            assert!(client.ticks() < 100, "emission never stopped");
            client.tick(0.8);
        }
        for _ in 0..3 {
            client.tick(0.8);
        }
        let settled = telemetry(client.drain_outbound());
        let final_update = settled.last().unwrap();
        assert_eq!(final_update.level, 0.0);
        assert_eq!(final_update.line_target, first);
        assert_eq!(client.store().own_avatar().unwrap().audio_level, 0.0);

        assert_eq!(client.pointer(last), Some(2));
        for _ in 0..3 {
            client.tick(0.8);
        }
        let reaimed = telemetry(client.drain_outbound());
        assert_eq!(reaimed.len(), 1);
        assert_eq!(reaimed[0].level, 0.0);
        assert_eq!(reaimed[0].line_target, last);

        for _ in 0..9 {
            client.tick(0.8);
        }
        assert!(telemetry(client.drain_outbound()).is_empty());
    }

    #[test]
    fn selecting_a_tree_stops_emission_after_the_delay() {
        let mut client = emitting("s-1-aa", 6);
        let tree = client.anchors()[1].position;

        assert_eq!(client.pointer(Point::new(tree.x + 10.0, tree.y)), Some(1));
        assert_eq!(client.store().own_avatar().unwrap().line_target, tree);

        // A second hit does not push the stop back.
        for _ in 0..10 {
            client.tick(0.0);
        }
        client.pointer(tree);
        for _ in 0..4 {
            client.tick(0.0);
        }
        assert!(client.is_emitting());
        client.tick(0.0);
        assert!(!client.is_emitting());
    }

    #[test]
    fn pointer_without_flower_selects_nothing() {
        let mut client = assigned("s-1-aa", 7);
        let tree = client.anchors()[0].position;
        assert_eq!(client.pointer(tree), None);
    }

    #[test]
    fn stages_advance_and_stop() {
        let mut client = emitting("s-1-aa", 8);
        assert_eq!(client.advance_stage(), Stage::Crystallization);
        assert_eq!(client.advance_stage(), Stage::Deterioration);
        assert_eq!(client.advance_stage(), Stage::Deterioration);
        assert_eq!(client.store().own_avatar().unwrap().stage, Stage::Deterioration);
    }

    #[test]
    fn marks_mirror_between_two_visitors() {
        let color_a = Rgb(138, 43, 226);
        let mut a = emitting("a", 9);
        let mut b = assigned("b", 10);

        b.apply(ServerEvent::FlowerBroadcast(grove_protocol::FlowerPayload {
            id: "a".into(),
            x: 400.0,
            y: 300.0,
            visual_token: "flower-1".into(),
            stage: Stage::Infatuation,
        }));

        let mut settled = 0;
        for _ in 0..10_000 {
            settled += a.tick(1.0);
            for event in a.drain_outbound() {
                if let Some(event) = relayed(event, "a", color_a) {
                    b.apply(event);
                }
            }
        }

        assert_eq!(settled, 150);
        assert_eq!(a.store().marks_owned_by("a"), 150);
        assert_eq!(b.store().marks_owned_by("a"), 150);
        assert_eq!(b.store().marks_owned_by("b"), 0);

        b.apply(ServerEvent::UserDisconnected("a".into()));
        assert!(b.store().avatar_of("a").is_none());
        assert_eq!(b.store().marks_owned_by("a"), 150);
    }
}
