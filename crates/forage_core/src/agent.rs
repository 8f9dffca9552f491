//! Agent state and the movement integrator.

use crate::config::{PerceptionConfig, ScalarInputs, SimConfig};
use crate::geometry::{bearing, linspace, wrap_angle, Rect};
use forage_data::{AgentMode, AgentRecord, RayLabel, Vec2};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Ray-cast sensor configuration and the buffers it fills each tick.
#[derive(Debug, Clone)]
pub struct Sensor {
    /// Ray angles relative to the heading, ascending.
    pub phis: Vec<f64>,
    pub vision_range: f64,
    /// Stdev of the per-tick heading perturbation, in radians.
    pub angle_noise_std: f64,
    pub labels: Vec<RayLabel>,
    /// Per-ray distance to the winning surface, when the channel is enabled.
    pub distances: Option<Vec<f64>>,
}

impl Sensor {
    pub fn new(config: &PerceptionConfig) -> Self {
        let half = config.fov * PI;
        Self {
            phis: linspace(-half, half, config.rays),
            vision_range: config.vision_range,
            angle_noise_std: config.angle_noise_std * TAU,
            labels: vec![RayLabel::Nothing; config.rays],
            distances: config
                .distance_transform
                .map(|_| vec![0.0; config.rays]),
        }
    }

    pub fn ray_count(&self) -> usize {
        self.phis.len()
    }

    pub(crate) fn clear(&mut self) {
        self.labels.fill(RayLabel::Nothing);
        if let Some(d) = self.distances.as_mut() {
            d.fill(0.0);
        }
    }
}

/// A foraging agent.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    pub position: Vec2,
    /// Heading in `[0, 2π)`.
    pub orientation: f64,
    pub velocity: f64,
    pub acceleration: f64,
    /// Extra speed for this tick's move, set by reflective collisions.
    pub speed_boost: f64,
    pub radius: f64,
    pub max_vel: f64,
    pub consumption: f64,
    pub extra_collision_block: f64,
    pub mode: AgentMode,
    /// Contact points gathered by this tick's collision pass.
    pub contacts: Vec<Vec2>,
    pub on_resource: bool,
    /// Patch bound by the resource resolver for this tick's consumption.
    pub bound_patch: Option<usize>,
    pub collected: f64,
    pub last_action: f64,
    pub sensor: Sensor,
}

impl Agent {
    pub fn new(id: usize, position: Vec2, orientation: f64, config: &SimConfig) -> Self {
        Self {
            id,
            position,
            orientation: wrap_angle(orientation),
            velocity: 0.0,
            acceleration: 0.0,
            speed_boost: 0.0,
            radius: config.agents.radius,
            max_vel: config.agents.max_vel,
            consumption: config.agents.consumption,
            extra_collision_block: config.agents.extra_collision_block,
            mode: AgentMode::Explore,
            contacts: Vec::new(),
            on_resource: false,
            bound_patch: None,
            collected: 0.0,
            last_action: 0.0,
            sensor: Sensor::new(&config.perception),
        }
    }

    /// Unit heading vector.
    #[inline]
    pub fn heading(&self) -> Vec2 {
        Vec2::from_heading(self.orientation)
    }

    /// Sensor origin, one radius ahead of the body centre.
    #[inline]
    pub fn eye(&self) -> Vec2 {
        self.position + self.heading() * self.radius
    }

    pub fn body(&self) -> Rect {
        Rect::around(self.position, self.radius)
    }

    pub fn bind_orientation(&mut self) {
        self.orientation = wrap_angle(self.orientation);
    }

    /// Clears per-tick state ahead of the collision pass.
    pub fn reset_transient(&mut self) {
        self.contacts.clear();
        self.mode = AgentMode::Explore;
        self.on_resource = false;
        self.bound_patch = None;
        self.speed_boost = 0.0;
    }

    pub fn mark_collision(&mut self, contact: Vec2) {
        self.mode = AgentMode::Collide;
        self.contacts.push(contact);
    }

    /// Applies a turn action in `[-1, 1]` and advances the position.
    ///
    /// Speed falls linearly with turn magnitude, plus any pending boost up
    /// to `max_vel`. While colliding, motion towards any recorded contact is
    /// blocked for this tick.
    pub fn move_with(&mut self, action: f64) {
        let action = if action.is_nan() {
            0.0
        } else {
            action.clamp(-1.0, 1.0)
        };
        self.orientation += action * FRAC_PI_2;
        self.bind_orientation();

        let previous = self.velocity;
        self.velocity = self.max_vel * (1.0 - action.abs());
        self.acceleration = self.velocity - previous;
        if self.speed_boost > 0.0 {
            self.velocity = (self.velocity + self.speed_boost).min(self.max_vel);
            self.speed_boost = 0.0;
        }

        if self.mode == AgentMode::Collide {
            let blocked = self.contacts.iter().any(|&pt| {
                heading_blocked(
                    self.orientation,
                    bearing(pt - self.position),
                    self.extra_collision_block,
                )
            });
            if blocked {
                self.velocity = 0.0;
            }
        }

        self.position += self.heading() * self.velocity;
    }

    /// Scalar inputs for the controller.
    pub fn scalar_inputs(&self, set: ScalarInputs) -> Vec<f64> {
        let on_res = if self.on_resource { 1.0 } else { 0.0 };
        let accel = self.acceleration / self.max_vel;
        match set {
            ScalarInputs::OnResource => vec![on_res],
            ScalarInputs::Acceleration => vec![accel],
            ScalarInputs::OnResourceAndAcceleration => vec![on_res, accel],
            ScalarInputs::Constant => vec![0.0],
        }
    }

    pub fn record(&self) -> AgentRecord {
        let eye = self.eye();
        AgentRecord {
            id: self.id,
            x: eye.x,
            y: eye.y,
            mode: self.mode,
            collected: self.collected,
        }
    }
}

/// True when `orientation` points into the half-plane facing a contact.
///
/// The blocking window is `bearing ± (π/2 + extra)`, evaluated with
/// explicit wraparound at 0 and 2π.
pub fn heading_blocked(orientation: f64, contact_bearing: f64, extra: f64) -> bool {
    let lo = contact_bearing - FRAC_PI_2 - extra;
    let hi = contact_bearing + FRAC_PI_2 + extra;
    if hi > TAU {
        lo < orientation || hi - TAU > orientation
    } else if lo < 0.0 {
        hi > orientation || lo + TAU < orientation
    } else {
        lo < orientation && orientation < hi
    }
}
