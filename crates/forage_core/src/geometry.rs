//! Planar geometry kernel.
//!
//! Pure functions over [`Vec2`]. Angles follow the arena's screen
//! orientation: headings are counter-clockwise on screen with `y` pointing
//! down, and relative angles are positive to the right (clockwise).

use forage_data::Vec2;
use std::f64::consts::{PI, TAU};

const PARALLEL_EPS: f64 = 1e-12;

/// Intersection point of the lines carried by `p1→p2` and `q1→q2`.
///
/// Both segments are extended to full lines, so a short direction probe
/// such as `(eye, eye + ray_dir)` still meets a distant wall chord.
/// Returns `None` when the two lines are parallel or collinear.
pub fn segment_intersection(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Option<Vec2> {
    let d1 = p2 - p1;
    let d2 = q2 - q1;
    let denom = d1.cross(d2);
    if denom.abs() <= PARALLEL_EPS * d1.length().max(1.0) * d2.length().max(1.0) {
        return None;
    }
    let t = (q1 - p1).cross(d2) / denom;
    let hit = p1 + d1 * t;
    hit.is_finite().then_some(hit)
}

/// Signed angle of `target` relative to the heading vector `self_dir`.
///
/// `self_dir` has length `self_radius` (eye offset from the body centre) and
/// `target` has length `target_distance`. The result lies in `(-π, π]` with
/// positive values to the right of the heading. A zero-length input yields 0.
pub fn angle_between(self_dir: Vec2, target: Vec2, self_radius: f64, target_distance: f64) -> f64 {
    let norm = self_radius * target_distance;
    if norm <= 0.0 || !norm.is_finite() {
        return 0.0;
    }
    let cos = (self_dir.dot(target) / norm).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if self_dir.cross(target) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// True when two discs strictly overlap.
#[inline]
pub fn circle_overlap(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> bool {
    let d = c2 - c1;
    let reach = r1 + r2;
    d.dot(d) < reach * reach
}

/// Wraps an angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_signed(angle: f64) -> f64 {
    let wrapped = wrap_angle(angle);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Heading of a displacement vector in `[0, 2π)`.
#[inline]
pub fn bearing(v: Vec2) -> f64 {
    wrap_angle((-v.y).atan2(v.x))
}

/// `count` evenly spaced values from `start` to `end` inclusive.
///
/// A single sample sits at `start`.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Axis-aligned rectangle used for wall bodies and agent bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    /// Bounding square of a disc.
    pub fn around(center: Vec2, radius: f64) -> Self {
        Self {
            min: Vec2::new(center.x - radius, center.y - radius),
            max: Vec2::new(center.x + radius, center.y + radius),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Overlapping region of two rectangles with positive area.
    pub fn clip(&self, other: &Rect) -> Option<Rect> {
        let min = Vec2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Vec2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        (min.x < max.x && min.y < max.y).then_some(Rect { min, max })
    }
}
