//! Colors and the session palette.
//!
//! The relay hands every new session one color drawn from [`PALETTE`].
//! Selection is uniform with replacement, so two concurrent visitors may
//! share a color.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An RGB triple, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Create a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Red component.
    pub const fn r(&self) -> u8 {
        self.0
    }

    /// Green component.
    pub const fn g(&self) -> u8 {
        self.1
    }

    /// Blue component.
    pub const fn b(&self) -> u8 {
        self.2
    }
}

/// The fixed set of session colors, in order.
pub const PALETTE: [Rgb; 10] = [
    Rgb(255, 99, 71),   // tomato
    Rgb(255, 182, 193), // light pink
    Rgb(255, 215, 0),   // gold
    Rgb(144, 238, 144), // light green
    Rgb(135, 206, 250), // light sky blue
    Rgb(221, 160, 221), // plum
    Rgb(255, 160, 122), // light salmon
    Rgb(64, 224, 208),  // turquoise
    Rgb(238, 130, 238), // violet
    Rgb(240, 230, 140), // khaki
];

/// Palette assigner over a fixed, ordered list of colors.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    colors: &'static [Rgb],
}

impl Default for Palette {
    fn default() -> Self {
        Self { colors: &PALETTE }
    }
}

impl Palette {
    /// Pick one color uniformly at random.
    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb {
        self.colors.choose(rng).copied().unwrap_or(PALETTE[0])
    }

    /// Whether `color` is one of this palette's entries.
    pub fn contains(&self, color: Rgb) -> bool {
        self.colors.contains(&color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn rgb_serializes_as_array() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 3)).unwrap();
        assert_eq!(json, "[1,2,3]");
        let back: Rgb = serde_json::from_str("[255,0,7]").unwrap();
        assert_eq!(back, Rgb(255, 0, 7));
    }

    #[test]
    fn assigned_colors_come_from_palette() {
        let palette = Palette::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(palette.contains(palette.assign(&mut rng)));
        }
    }

    #[test]
    fn selection_covers_whole_palette() {
        let palette = Palette::default();
        let mut rng = StdRng::seed_from_u64(99);
        let seen: HashSet<_> = (0..2_000).map(|_| palette.assign(&mut rng)).collect();
        assert_eq!(seen.len(), PALETTE.len());
    }
}
