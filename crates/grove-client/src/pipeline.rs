//! Local effect pipeline: audio level in, settled marks out.
//!
//! Every tick the pipeline may spawn one particle at the emission source,
//! steps all live particles, and turns the ones that settled into marks as
//! long as the visitor's [`MarkBudget`](crate::MarkBudget) allows.

use grove_protocol::{Mark, Point};
use rand::Rng;
use tracing::{debug, trace};

use crate::config::PipelineConfig;
use crate::context::SessionContext;
use crate::particle::{Particle, ParticleArena};

/// Particle emitter and settlement stage for one visitor.
#[derive(Debug, Clone, Default)]
pub struct EffectPipeline {
    arena: ParticleArena,
    source: Option<Point>,
    active: bool,
}

impl EffectPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start emitting from `source`.
    pub fn start(&mut self, source: Point) {
        self.source = Some(source);
        self.active = true;
    }

    /// Stop spawning. Particles already in flight still settle.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn source(&self) -> Option<Point> {
        self.source
    }

    pub fn particles(&self) -> &ParticleArena {
        &self.arena
    }

    /// Run one tick at audio level `level` and return the marks that
    /// settled.
    pub fn tick(&mut self, ctx: &mut SessionContext, config: &PipelineConfig, level: f32) -> Vec<Mark> {
        self.maybe_spawn(ctx, config, level);

        let settled = self.arena.step(config);
        if settled.is_empty() {
            return Vec::new();
        }

        let Some(owner) = ctx.session_id().map(str::to_string) else {
            return Vec::new();
        };

        let mut marks = Vec::with_capacity(settled.len());
        for particle in settled {
            if !ctx.budget.try_claim() {
                trace!("mark cap reached, dropping settled particle");
                continue;
            }
            marks.push(Mark {
                x: particle.x,
                y: particle.y,
                color: particle.color,
                size: particle.size,
                owner_id: owner.clone(),
            });
        }

        if ctx.budget.is_exhausted() && !marks.is_empty() {
            debug!(owner = %owner, cap = ctx.budget.cap(), "mark cap reached");
        }
        marks
    }

    fn maybe_spawn(&mut self, ctx: &mut SessionContext, config: &PipelineConfig, level: f32) {
        if !self.active || level <= config.spawn_threshold || ctx.budget.is_exhausted() {
            return;
        }
        let (Some(origin), Some(color)) = (self.source, ctx.color()) else {
            return;
        };
        if !ctx.rng.gen_bool(config.spawn_rate.clamp(0.0, 1.0)) {
            return;
        }

        let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        let velocity = (angle.cos() * config.speed, angle.sin() * config.speed);
        let size = ctx.rng.gen_range(config.min_size..=config.max_size);

        self.arena.spawn(Particle::new(origin, velocity, size, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_protocol::{Assignment, Rgb};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(cap: usize, seed: u64) -> SessionContext {
        let mut ctx = SessionContext::new(cap, StdRng::seed_from_u64(seed));
        ctx.assign(Assignment {
            session_id: "s-0-local".into(),
            color: Rgb(64, 224, 208),
        });
        ctx
    }

    fn running() -> EffectPipeline {
        let mut pipeline = EffectPipeline::new();
        pipeline.start(Point::new(640.0, 360.0));
        pipeline
    }

    #[test]
    fn quiet_audio_spawns_nothing() {
        let config = PipelineConfig::default();
        let mut ctx = context(150, 1);
        let mut pipeline = running();
        for _ in 0..1_000 {
            pipeline.tick(&mut ctx, &config, config.spawn_threshold);
        }
        assert!(pipeline.particles().is_empty());
        assert_eq!(ctx.budget.used(), 0);
    }

    #[test]
    fn inactive_pipeline_spawns_nothing() {
        let config = PipelineConfig::default();
        let mut ctx = context(150, 2);
        let mut pipeline = EffectPipeline::new();
        for _ in 0..1_000 {
            assert!(pipeline.tick(&mut ctx, &config, 1.0).is_empty());
        }
        assert!(pipeline.particles().is_empty());
    }

    #[test]
    fn unassigned_visitor_spawns_nothing() {
        let config = PipelineConfig::default();
        let mut ctx = SessionContext::new(150, StdRng::seed_from_u64(3));
        let mut pipeline = running();
        for _ in 0..1_000 {
            pipeline.tick(&mut ctx, &config, 1.0);
        }
        assert!(pipeline.particles().is_empty());
    }

    #[test]
    fn marks_inherit_particle_fields() {
        let config = PipelineConfig::default();
        let mut ctx = context(150, 4);
        let mut pipeline = running();

        let mut marks = Vec::new();
        for _ in 0..2_000 {
            marks.extend(pipeline.tick(&mut ctx, &config, 1.0));
        }
        assert!(!marks.is_empty());
        for mark in &marks {
            assert_eq!(mark.owner_id, "s-0-local");
            assert_eq!(mark.color, Rgb(64, 224, 208));
            assert!(mark.size >= config.min_size && mark.size <= config.max_size);
        }
        assert_eq!(marks.len(), ctx.budget.used());
    }

    #[test]
    fn stopped_pipeline_drains_in_flight_particles() {
        let config = PipelineConfig::default();
        let mut ctx = context(150, 5);
        let mut pipeline = running();
        while pipeline.particles().is_empty() {
            pipeline.tick(&mut ctx, &config, 1.0);
        }

        pipeline.stop();
        for _ in 0..200 {
            pipeline.tick(&mut ctx, &config, 1.0);
        }
        assert!(pipeline.particles().is_empty());
        assert!(ctx.budget.used() >= 1);
    }

    #[test]
    fn cap_of_150_is_reached_and_held() {
        let config = PipelineConfig::default();
        let mut ctx = context(150, 6);
        let mut pipeline = running();
        let mut total = 0;
        for _ in 0..10_000 {
            total += pipeline.tick(&mut ctx, &config, 1.0).len();
        }
        assert_eq!(total, 150);
        assert!(ctx.budget.is_exhausted());
        assert!(pipeline.particles().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn settled_marks_never_exceed_cap(
            seed in any::<u64>(),
            cap in 0usize..200,
            spawn_rate in 0.0f64..=1.0,
        ) {
            let config = PipelineConfig {
                spawn_rate,
                mark_cap: cap,
                ..PipelineConfig::default()
            };
            let mut ctx = context(cap, seed);
            let mut pipeline = running();
            let mut total = 0;
            for _ in 0..10_000 {
                total += pipeline.tick(&mut ctx, &config, 1.0).len();
                prop_assert!(ctx.budget.used() <= cap);
            }
            prop_assert_eq!(total, ctx.budget.used());
            prop_assert!(total <= cap);
        }
    }
}
