//! Static scene geometry: boundary corners, wall bodies and landmarks.

use crate::config::SimConfig;
use crate::geometry::Rect;
use forage_data::{Vec2, WallSide};

/// Circular static obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub id: usize,
    pub center: Vec2,
    pub radius: f64,
}

/// Solid strip along one arena edge, used for agent-wall collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallBody {
    pub side: WallSide,
    pub rect: Rect,
}

/// Immutable arena shared by all agents for the whole episode.
#[derive(Debug, Clone)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    /// Perceived corners: top-left, top-right, bottom-left, bottom-right.
    pub corners: [Vec2; 4],
    pub walls: Vec<WallBody>,
    pub landmarks: Vec<Landmark>,
}

impl Arena {
    pub fn new(config: &SimConfig) -> Self {
        let caps = config.capabilities();
        let (w, h) = (config.arena.width, config.arena.height);
        let s = config.arena.boundary_scale;
        let t = config.agents.radius;

        let walls = if caps.has_walls {
            vec![
                WallBody {
                    side: WallSide::North,
                    rect: Rect::new(0.0, 0.0, w, t),
                },
                WallBody {
                    side: WallSide::South,
                    rect: Rect::new(0.0, h - t, w, t),
                },
                WallBody {
                    side: WallSide::East,
                    rect: Rect::new(w - t, 0.0, t, h),
                },
                WallBody {
                    side: WallSide::West,
                    rect: Rect::new(0.0, 0.0, t, h),
                },
            ]
        } else {
            Vec::new()
        };

        let landmarks = if caps.has_landmarks {
            config
                .arena
                .landmarks
                .iter()
                .enumerate()
                .map(|(id, lm)| Landmark {
                    id,
                    center: Vec2::new(lm.x, lm.y),
                    radius: lm.radius,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            width: w,
            height: h,
            corners: [
                Vec2::new(-s, -s),
                Vec2::new(w + s, -s),
                Vec2::new(-s, h + s),
                Vec2::new(w + s, h + s),
            ],
            walls,
            landmarks,
        }
    }

    pub fn has_walls(&self) -> bool {
        !self.walls.is_empty()
    }

    /// Visible wall chords as `(side, left, right)` seen from inside, so that
    /// sweeping clockwise goes from `left` to `right`.
    pub fn wall_segments(&self) -> [(WallSide, Vec2, Vec2); 4] {
        let [tl, tr, bl, br] = self.corners;
        [
            (WallSide::North, tl, tr),
            (WallSide::South, br, bl),
            (WallSide::East, tr, br),
            (WallSide::West, bl, tl),
        ]
    }

    /// Region where an agent of `radius` may be spawned.
    pub fn spawn_bounds(&self, radius: f64) -> (Vec2, Vec2) {
        (
            Vec2::new(2.0 * radius, 2.0 * radius),
            Vec2::new(self.width - 2.0 * radius, self.height - 2.0 * radius),
        )
    }
}
