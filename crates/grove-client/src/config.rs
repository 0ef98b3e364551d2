//! Tuning for the local effect pipeline.

/// Configuration for one visitor's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Canvas width in canvas units
    pub canvas_width: f32,
    /// Canvas height in canvas units
    pub canvas_height: f32,

    /// Audio level a tick must exceed before it may spawn a particle
    pub spawn_threshold: f32,
    /// Probability that a loud enough tick spawns a particle
    pub spawn_rate: f64,
    /// Most marks one visitor may settle
    pub mark_cap: usize,

    /// Initial particle speed
    pub speed: f32,
    /// Velocity multiplier per tick (closer to 1 travels further)
    pub damping: f32,
    /// Added to vertical velocity every tick
    pub gravity: f32,
    /// Life lost per tick
    pub life_step: f32,
    /// Both velocity components below this means the particle settled
    pub settle_epsilon: f32,
    /// Particle size bounds (inclusive)
    pub min_size: f32,
    pub max_size: f32,

    /// Send telemetry at most once per this many ticks
    pub telemetry_every: u32,
    /// Pointer distance that selects an anchor
    pub hit_radius: f32,
    /// How far outside the canvas the initial line target sits
    pub edge_margin: f32,
    /// Ticks between selecting an anchor and emission stopping
    pub stop_delay_ticks: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280.0,
            canvas_height: 720.0,
            spawn_threshold: 0.2,
            spawn_rate: 0.15,
            mark_cap: 150,
            speed: 4.0,
            damping: 0.92,
            gravity: 0.005,
            life_step: 0.01,
            settle_epsilon: 0.1,
            min_size: 2.0,
            max_size: 5.0,
            telemetry_every: 3,
            hit_radius: 40.0,
            edge_margin: 60.0,
            stop_delay_ticks: 15,
        }
    }
}

impl PipelineConfig {
    /// Same physics on a different canvas.
    pub fn with_canvas(mut self, width: f32, height: f32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Same physics with a different mark cap.
    pub fn with_mark_cap(mut self, cap: usize) -> Self {
        self.mark_cap = cap;
        self
    }
}
