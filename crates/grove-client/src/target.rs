//! Where a visitor's flower points its line.
//!
//! The first gesture aims the line at a random point just beyond one of the
//! canvas edges. Pointing near a tree re-aims it at that tree.

use grove_protocol::Point;
use rand::Rng;

/// A fixed landmark (tree) on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub position: Point,
    pub visual_token: String,
}

impl Anchor {
    pub fn new(x: f32, y: f32, visual_token: impl Into<String>) -> Self {
        Self {
            position: Point::new(x, y),
            visual_token: visual_token.into(),
        }
    }
}

/// Three trees spread across the lower half of a `width` x `height` canvas.
pub fn default_anchors(width: f32, height: f32) -> Vec<Anchor> {
    vec![
        Anchor::new(width * 0.2, height * 0.7, "tree-1"),
        Anchor::new(width * 0.5, height * 0.6, "tree-2"),
        Anchor::new(width * 0.8, height * 0.7, "tree-3"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

const EDGES: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

/// Picks attraction targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetSelector;

impl TargetSelector {
    /// A uniformly random point along a uniformly random edge, pushed
    /// `margin` units outside the canvas.
    pub fn place_off_canvas<R: Rng + ?Sized>(rng: &mut R, width: f32, height: f32, margin: f32) -> Point {
        let edge = EDGES[rng.gen_range(0..EDGES.len())];
        match edge {
            Edge::Top => Point::new(rng.gen_range(0.0..=width), -margin),
            Edge::Bottom => Point::new(rng.gen_range(0.0..=width), height + margin),
            Edge::Left => Point::new(-margin, rng.gen_range(0.0..=height)),
            Edge::Right => Point::new(width + margin, rng.gen_range(0.0..=height)),
        }
    }

    /// Index of the first anchor within `radius` of `pointer`.
    pub fn select(pointer: Point, anchors: &[Anchor], radius: f32) -> Option<usize> {
        anchors.iter().position(|a| a.position.within(&pointer, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn off_canvas_targets_sit_on_the_margin() {
        let mut rng = StdRng::seed_from_u64(11);
        let (w, h, m) = (1280.0, 720.0, 60.0);
        let mut edges = [false; 4];

        for _ in 0..500 {
            let p = TargetSelector::place_off_canvas(&mut rng, w, h, m);
            let idx = if p.y == -m {
                assert!((0.0..=w).contains(&p.x));
                0
            } else if p.x == w + m {
                assert!((0.0..=h).contains(&p.y));
                1
            } else if p.y == h + m {
                assert!((0.0..=w).contains(&p.x));
                2
            } else {
                assert_eq!(p.x, -m);
                assert!((0.0..=h).contains(&p.y));
                3
            };
            edges[idx] = true;
        }
        assert!(edges.iter().all(|&e| e), "every edge gets picked");
    }

    #[test]
    fn first_matching_anchor_wins() {
        let anchors = vec![
            Anchor::new(100.0, 100.0, "tree-a"),
            Anchor::new(120.0, 100.0, "tree-b"),
            Anchor::new(500.0, 500.0, "tree-c"),
        ];

        assert_eq!(TargetSelector::select(Point::new(115.0, 100.0), &anchors, 40.0), Some(0));
        assert_eq!(TargetSelector::select(Point::new(150.0, 100.0), &anchors, 40.0), Some(1));
        assert_eq!(TargetSelector::select(Point::new(530.0, 500.0), &anchors, 40.0), Some(2));
        assert_eq!(TargetSelector::select(Point::new(300.0, 300.0), &anchors, 40.0), None);
    }

    #[test]
    fn radius_is_inclusive() {
        let anchors = vec![Anchor::new(0.0, 0.0, "tree")];
        assert_eq!(TargetSelector::select(Point::new(40.0, 0.0), &anchors, 40.0), Some(0));
        assert_eq!(TargetSelector::select(Point::new(40.5, 0.0), &anchors, 40.0), None);
    }

    #[test]
    fn default_anchors_fit_the_canvas() {
        let anchors = default_anchors(1280.0, 720.0);
        assert_eq!(anchors.len(), 3);
        for a in &anchors {
            assert!((0.0..=1280.0).contains(&a.position.x));
            assert!((0.0..=720.0).contains(&a.position.y));
        }
    }
}
