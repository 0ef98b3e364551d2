//! Transient particles and the arena that steps them.
//!
//! Particles are plain values in a `Vec`. Each tick the arena advances
//! every slot and compacts survivors towards the front in the same pass,
//! handing back the ones that settled.

use grove_protocol::{Point, Rgb};

use crate::config::PipelineConfig;

/// A short-lived, simulated point that either fades or settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining life in `[0, 1]`, never increases.
    pub life: f32,
    pub size: f32,
    pub color: Rgb,
    pub settled: bool,
}

impl Particle {
    /// A fresh particle at `origin` moving with the given velocity.
    pub fn new(origin: Point, velocity: (f32, f32), size: f32, color: Rgb) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            vx: velocity.0,
            vy: velocity.1,
            life: 1.0,
            size,
            color,
            settled: false,
        }
    }

    /// Advance one tick: integrate, damp, fall, age.
    pub fn advance(&mut self, config: &PipelineConfig) {
        self.x += self.vx;
        self.y += self.vy;

        self.vx *= config.damping;
        self.vy *= config.damping;
        self.vy += config.gravity;

        self.life = (self.life - config.life_step).clamp(0.0, 1.0);

        if self.vx.abs() < config.settle_epsilon && self.vy.abs() < config.settle_epsilon {
            self.settled = true;
        }
    }

    pub fn is_faded(&self) -> bool {
        self.life <= 0.0
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Live particles of one visitor.
#[derive(Debug, Clone, Default)]
pub struct ParticleArena {
    slots: Vec<Particle>,
}

impl ParticleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, particle: Particle) {
        self.slots.push(particle);
    }

    /// Advance every particle one tick.
    ///
    /// Faded particles are discarded, settled ones are removed and
    /// returned, and the rest stay in their original order. A particle
    /// that fades on the same tick it settles counts as faded.
    pub fn step(&mut self, config: &PipelineConfig) -> Vec<Particle> {
        let mut settled = Vec::new();
        let mut keep = 0;

        for i in 0..self.slots.len() {
            let mut particle = self.slots[i];
            particle.advance(config);

            if particle.is_faded() {
                continue;
            }
            if particle.settled {
                settled.push(particle);
                continue;
            }
            self.slots[keep] = particle;
            keep += 1;
        }

        self.slots.truncate(keep);
        settled
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn particle(vx: f32, vy: f32) -> Particle {
        Particle::new(Point::new(100.0, 100.0), (vx, vy), 3.0, Rgb(9, 9, 9))
    }

    #[test]
    fn advance_integrates_before_damping() {
        let config = PipelineConfig::default();
        let mut p = particle(4.0, 0.0);
        p.advance(&config);

        assert_eq!(p.x, 104.0);
        assert_eq!(p.y, 100.0);
        assert!((p.vx - 4.0 * config.damping).abs() < 1e-6);
        assert!((p.vy - config.gravity).abs() < 1e-6);
        assert!((p.life - (1.0 - config.life_step)).abs() < 1e-6);
        assert!(!p.settled);
    }

    #[test]
    fn slow_particle_settles_immediately() {
        let config = PipelineConfig::default();
        let mut arena = ParticleArena::new();
        arena.spawn(particle(0.01, 0.0));
        arena.spawn(particle(4.0, 4.0));

        let settled = arena.step(&config);
        assert_eq!(settled.len(), 1);
        assert_eq!(arena.len(), 1);
        assert!(arena.iter().all(|p| !p.settled));
    }

    #[test]
    fn faded_particles_are_discarded() {
        let config = PipelineConfig {
            life_step: 0.6,
            ..PipelineConfig::default()
        };
        let mut arena = ParticleArena::new();
        arena.spawn(particle(4.0, 0.0));

        assert!(arena.step(&config).is_empty());
        assert_eq!(arena.len(), 1);
        assert!(arena.step(&config).is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn fading_wins_over_settling() {
        let config = PipelineConfig {
            life_step: 1.0,
            ..PipelineConfig::default()
        };
        let mut arena = ParticleArena::new();
        arena.spawn(particle(0.0, 0.0));
        assert!(arena.step(&config).is_empty());
        assert!(arena.is_empty());
    }

    #[test]
    fn compaction_keeps_order() {
        let config = PipelineConfig::default();
        let mut arena = ParticleArena::new();
        for i in 0..6 {
            // Even slots settle right away, odd slots keep moving.
            let speed = if i % 2 == 0 { 0.0 } else { 3.0 + i as f32 };
            arena.spawn(particle(speed, 0.0));
        }

        assert_eq!(arena.step(&config).len(), 3);
        let speeds: Vec<f32> = arena.iter().map(|p| p.vx / config.damping).collect();
        assert_eq!(speeds.len(), 3);
        assert!(speeds.windows(2).all(|w| w[0] < w[1]));
    }

    proptest! {
        #[test]
        fn life_never_increases(
            vx in -10.0f32..10.0,
            vy in -10.0f32..10.0,
            ticks in 1usize..300,
        ) {
            let config = PipelineConfig::default();
            let mut p = particle(vx, vy);
            let mut last = p.life;
            for _ in 0..ticks {
                p.advance(&config);
                prop_assert!(p.life <= last);
                prop_assert!((0.0..=1.0).contains(&p.life));
                last = p.life;
            }
        }

        #[test]
        fn faded_particles_never_settle_out(
            vx in 1.0f32..10.0,
            vy in 1.0f32..10.0,
            step in 0.05f32..0.5,
        ) {
            // Barely any damping: nothing slows down before its life runs out.
            let config = PipelineConfig {
                damping: 0.999,
                life_step: step,
                ..PipelineConfig::default()
            };
            let mut arena = ParticleArena::new();
            arena.spawn(particle(vx, vy));
            let mut settled = 0;
            for _ in 0..100 {
                settled += arena.step(&config).len();
            }
            prop_assert_eq!(settled, 0);
            prop_assert!(arena.is_empty());
        }
    }
}
