//! Outbound telemetry rate limiting.

/// Lets one telemetry update through every `every` ticks.
///
/// Nothing is queued: a tick that is not ready simply skips sending, and the
/// next ready tick carries whatever the latest state is by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    every: u32,
    counter: u32,
}

impl Throttle {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            counter: 0,
        }
    }

    /// Count one tick. Returns `true` on every `every`-th call.
    pub fn ready(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.every {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}
