//! Emotional stages a visitor moves through.

use serde::{Deserialize, Serialize};

use crate::Rgb;

/// A visitor's current stage. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Infatuation,
    Crystallization,
    Deterioration,
}

impl Stage {
    /// All stages in order.
    pub const ALL: [Stage; 3] = [
        Stage::Infatuation,
        Stage::Crystallization,
        Stage::Deterioration,
    ];

    /// The following stage; the last stage is terminal.
    pub fn next(self) -> Self {
        match self {
            Stage::Infatuation => Stage::Crystallization,
            Stage::Crystallization => Stage::Deterioration,
            Stage::Deterioration => Stage::Deterioration,
        }
    }

    pub fn is_last(self) -> bool {
        self == Stage::Deterioration
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Infatuation => "Infatuation",
            Stage::Crystallization => "Crystallization",
            Stage::Deterioration => "Deterioration",
        }
    }

    /// Tint used for the stage's soundwave.
    pub fn tint(self) -> Rgb {
        match self {
            Stage::Infatuation => Rgb(255, 182, 193),
            Stage::Crystallization => Rgb(255, 140, 180),
            Stage::Deterioration => Rgb(180, 140, 200),
        }
    }
}
