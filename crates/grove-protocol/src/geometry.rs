//! Canvas coordinates.

use serde::{Deserialize, Serialize};

/// A point on the shared canvas, serialized as `{"x": .., "y": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether `other` lies within `radius` of this point (inclusive).
    pub fn within(&self, other: &Self, radius: f32) -> bool {
        self.distance(other) <= radius
    }
}
