//! Ray-cast visual perception.
//!
//! Each agent casts a fan of rays across its field of view. Every surface
//! (wall chord, landmark, other agent) is reduced to the angular span it
//! subtends from the sensor origin; a ray takes the label of the nearest
//! dynamic object whose span contains it, falling back to the wall behind.
//!
//! Walls tile the full circle, so in a walled arena every ray resolves.

use crate::agent::Agent;
use crate::arena::Arena;
use crate::geometry::{angle_between, segment_intersection};
use crate::metrics::Metrics;
use forage_data::{AgentMode, ChannelLayout, RayLabel, Vec2, WallSide};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Mapping from raw ray distance to a `[0, 1]` intensity.
///
/// The `*Wf` variants are Weber-Fechner style log compressions that map the
/// arena's distance range into progressively narrower bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceTransform {
    #[serde(rename = "minmax")]
    MinMax,
    #[serde(rename = "far")]
    Far,
    #[serde(rename = "maxWF")]
    MaxWf,
    #[serde(rename = "p9WF")]
    P9Wf,
    #[serde(rename = "p8WF")]
    P8Wf,
    #[serde(rename = "WF")]
    Wf,
    #[serde(rename = "mlWF")]
    MlWf,
    #[serde(rename = "mWF")]
    MWf,
    #[serde(rename = "msWF")]
    MsWf,
    #[serde(rename = "sWF")]
    SWf,
    #[serde(rename = "ssWF")]
    SsWf,
}

impl FromStr for DistanceTransform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s.trim() {
            "minmax" => DistanceTransform::MinMax,
            "far" => DistanceTransform::Far,
            "maxWF" => DistanceTransform::MaxWf,
            "p9WF" => DistanceTransform::P9Wf,
            "p8WF" => DistanceTransform::P8Wf,
            "WF" => DistanceTransform::Wf,
            "mlWF" => DistanceTransform::MlWf,
            "mWF" => DistanceTransform::MWf,
            "msWF" => DistanceTransform::MsWf,
            "sWF" => DistanceTransform::SWf,
            "ssWF" => DistanceTransform::SsWf,
            other => anyhow::bail!("Unrecognized distance transform '{other}'"),
        })
    }
}

impl DistanceTransform {
    /// Unclipped transform of one distance.
    pub fn apply(self, distance: f64, min_dist: f64, max_dist: f64) -> f64 {
        let ln = distance.ln();
        match self {
            DistanceTransform::MinMax => (distance - min_dist) / (max_dist - min_dist),
            DistanceTransform::Far => min_dist * 2.0 / distance,
            DistanceTransform::MaxWf => 1.465 - ln / 5.0,
            DistanceTransform::P9Wf => 1.29 - ln / 6.1,
            DistanceTransform::P8Wf => 1.09 - ln / 8.2,
            DistanceTransform::Wf => 1.24 - ln / 7.0,
            DistanceTransform::MlWf => 1.0 - ln / 9.65,
            DistanceTransform::MWf => 0.9 - ln / 12.0,
            DistanceTransform::MsWf => 0.8 - ln / 16.0,
            DistanceTransform::SWf => 0.7 - ln / 24.0,
            DistanceTransform::SsWf => 0.6 - ln / 48.0,
        }
    }
}

/// Angular interval `[left, right]` relative to the heading.
///
/// `left > right` marks a span that wraps through the direction directly
/// behind the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub left: f64,
    pub right: f64,
}

impl Span {
    #[inline]
    pub fn contains(&self, phi: f64) -> bool {
        self.left <= phi && phi <= self.right
    }

    #[inline]
    pub fn wraps(&self) -> bool {
        self.left > self.right
    }

    #[inline]
    fn contains_wrapped(&self, phi: f64) -> bool {
        phi >= self.left || phi <= self.right
    }
}

/// Anything a ray can land on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Wall {
        side: WallSide,
        left: Vec2,
        right: Vec2,
    },
    Landmark {
        id: usize,
        center: Vec2,
        radius: f64,
    },
    Agent {
        id: usize,
        center: Vec2,
        radius: f64,
        mode: AgentMode,
    },
}

impl Surface {
    pub fn label(&self) -> RayLabel {
        match *self {
            Surface::Wall { side, .. } => RayLabel::Wall(side),
            Surface::Landmark { .. } => RayLabel::Landmark,
            Surface::Agent {
                mode: AgentMode::Exploit,
                ..
            } => RayLabel::AgentExploit,
            Surface::Agent { .. } => RayLabel::AgentExplore,
        }
    }

    /// Chord a ray is intersected against: the wall segment itself, or the
    /// diameter of a disc perpendicular to the line of sight.
    fn chord(&self, eye: Vec2) -> Option<(Vec2, Vec2)> {
        match *self {
            Surface::Wall { left, right, .. } => Some((left, right)),
            Surface::Landmark { center, radius, .. } | Surface::Agent { center, radius, .. } => {
                let across = (center - eye).normalized()?.perp() * radius;
                Some((center - across, center + across))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub surface: Surface,
    pub span: Span,
    /// Distance from the sensor origin to the surface reference point.
    pub distance: f64,
}

/// Position, size and mode of an agent as seen by the others this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub id: usize,
    pub position: Vec2,
    pub radius: f64,
    pub mode: AgentMode,
}

impl From<&Agent> for BodyView {
    fn from(a: &Agent) -> Self {
        Self {
            id: a.id,
            position: a.position,
            radius: a.radius,
            mode: a.mode,
        }
    }
}

pub struct PerceptionContext<'a> {
    pub arena: &'a Arena,
    pub bodies: &'a [BodyView],
    pub see_agents: bool,
    pub metrics: &'a Metrics,
}

/// Sensor pose for one perception pass.
#[derive(Debug, Clone, Copy)]
struct Viewpoint {
    eye: Vec2,
    self_dir: Vec2,
    radius: f64,
    heading: f64,
}

impl Viewpoint {
    fn ray_dir(&self, phi: f64) -> Vec2 {
        Vec2::from_heading(self.heading - phi)
    }

    fn angle_to(&self, point: Vec2) -> (f64, f64) {
        let v = point - self.eye;
        let d = v.length();
        (angle_between(self.self_dir, v, self.radius, d), d)
    }
}

/// Refreshes `agent.sensor` from the current scene.
///
/// A single Gaussian heading perturbation is drawn per call; the agent's
/// stored orientation is left untouched.
pub fn sense<R: Rng + ?Sized>(agent: &mut Agent, ctx: &PerceptionContext<'_>, rng: &mut R) {
    let noise = if agent.sensor.angle_noise_std > 0.0 {
        rng.sample::<f64, _>(StandardNormal) * agent.sensor.angle_noise_std
    } else {
        0.0
    };
    let heading = agent.orientation + noise;
    let eye = agent.position + Vec2::from_heading(heading) * agent.radius;
    let view = Viewpoint {
        eye,
        self_dir: eye - agent.position,
        radius: agent.radius,
        heading,
    };

    let walls = if ctx.arena.has_walls() {
        wall_candidates(&view, ctx.arena)
    } else {
        Vec::new()
    };

    let sensor = &mut agent.sensor;
    let fov = match (sensor.phis.first(), sensor.phis.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return,
    };
    let mut objects = Vec::new();
    for lm in &ctx.arena.landmarks {
        push_object(
            &mut objects,
            &view,
            fov,
            sensor.vision_range,
            Surface::Landmark {
                id: lm.id,
                center: lm.center,
                radius: lm.radius,
            },
        );
    }
    if ctx.see_agents {
        for body in ctx.bodies.iter().filter(|b| b.id != agent.id) {
            push_object(
                &mut objects,
                &view,
                fov,
                sensor.vision_range,
                Surface::Agent {
                    id: body.id,
                    center: body.position,
                    radius: body.radius,
                    mode: body.mode,
                },
            );
        }
    }

    sensor.clear();
    let want_distance = sensor.distances.is_some();
    for (i, &phi) in sensor.phis.iter().enumerate() {
        let Some(winner) = resolve_ray(phi, &walls, &objects) else {
            continue;
        };
        let mut distance = 0.0;
        if want_distance {
            match ray_distance(&view, phi, &winner.surface) {
                Some(d) => distance = d,
                None => {
                    tracing::warn!(
                        agent = agent.id,
                        ray = i,
                        phi,
                        "Ray parallel to its surface, leaving it unresolved"
                    );
                    ctx.metrics.record_degenerate_ray();
                    continue;
                }
            }
        }
        sensor.labels[i] = winner.surface.label();
        if let Some(d) = sensor.distances.as_mut() {
            d[i] = distance;
        }
    }
}

fn wall_candidates(view: &Viewpoint, arena: &Arena) -> Vec<Candidate> {
    arena
        .wall_segments()
        .iter()
        .map(|&(side, left, right)| {
            let (angle_l, dist_l) = view.angle_to(left);
            let (angle_r, dist_r) = view.angle_to(right);
            Candidate {
                surface: Surface::Wall { side, left, right },
                span: Span {
                    left: angle_l,
                    right: angle_r,
                },
                distance: dist_l.min(dist_r),
            }
        })
        .collect()
}

fn push_object(
    out: &mut Vec<Candidate>,
    view: &Viewpoint,
    fov: (f64, f64),
    vision_range: f64,
    surface: Surface,
) {
    let (center, radius) = match surface {
        Surface::Landmark { center, radius, .. } | Surface::Agent { center, radius, .. } => {
            (center, radius)
        }
        Surface::Wall { .. } => return,
    };
    let (bearing, distance) = view.angle_to(center);
    if distance > vision_range {
        return;
    }
    let half = if distance > 0.0 {
        (radius / distance).atan()
    } else {
        std::f64::consts::FRAC_PI_2
    };
    let span = Span {
        left: bearing - half,
        right: bearing + half,
    };
    if span.left <= fov.1 && span.right >= fov.0 {
        out.push(Candidate {
            surface,
            span,
            distance,
        });
    }
}

/// Winning candidate for one ray.
///
/// The nearest dynamic object containing `phi` wins outright. Otherwise the
/// last wall whose span contains `phi` is taken, then a wrapping span.
pub fn resolve_ray<'c>(
    phi: f64,
    walls: &'c [Candidate],
    objects: &'c [Candidate],
) -> Option<&'c Candidate> {
    let nearest = objects
        .iter()
        .filter(|c| c.span.contains(phi))
        .fold(None::<&Candidate>, |best, c| match best {
            Some(b) if b.distance <= c.distance => Some(b),
            _ => Some(c),
        });
    if nearest.is_some() {
        return nearest;
    }

    walls
        .iter()
        .rev()
        .find(|c| c.span.contains(phi))
        .or_else(|| {
            walls
                .iter()
                .rev()
                .find(|c| c.span.wraps() && c.span.contains_wrapped(phi))
        })
        .or_else(|| walls.iter().rev().find(|c| c.span.wraps()))
}

fn ray_distance(view: &Viewpoint, phi: f64, surface: &Surface) -> Option<f64> {
    let Some((a, b)) = surface.chord(view.eye) else {
        return Some(0.0);
    };
    let hit = segment_intersection(view.eye, view.eye + view.ray_dir(phi), a, b)?;
    Some(view.eye.distance(hit))
}

/// One-hot visual input, stored channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualEncoding {
    pub layout: ChannelLayout,
    rays: usize,
    data: Vec<f64>,
}

impl VisualEncoding {
    pub fn zeros(layout: ChannelLayout, rays: usize) -> Self {
        Self {
            layout,
            rays,
            data: vec![0.0; layout.channel_count() * rays],
        }
    }

    pub fn channels(&self) -> usize {
        self.layout.channel_count()
    }

    pub fn rays(&self) -> usize {
        self.rays
    }

    #[inline]
    pub fn get(&self, channel: usize, ray: usize) -> f64 {
        self.data[channel * self.rays + ray]
    }

    pub fn channel(&self, channel: usize) -> &[f64] {
        &self.data[channel * self.rays..(channel + 1) * self.rays]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Multiplies every channel of ray `i` by `weights[i]`.
    pub fn scale_rays(&mut self, weights: &[f64]) {
        let rays = self.rays;
        for row in self.data.chunks_mut(rays) {
            for (v, w) in row.iter_mut().zip(weights) {
                *v *= *w;
            }
        }
    }
}

pub fn encode_one_hot(labels: &[RayLabel], layout: ChannelLayout) -> VisualEncoding {
    let mut enc = VisualEncoding::zeros(layout, labels.len());
    for (ray, &label) in labels.iter().enumerate() {
        if let Some(ch) = layout.channel_of(label) {
            enc.data[ch * enc.rays + ray] = 1.0;
        }
    }
    enc
}

/// Transformed, noised and clipped distance weights for each ray.
pub fn distance_weights<R: Rng + ?Sized>(
    distances: &[f64],
    transform: DistanceTransform,
    min_dist: f64,
    max_dist: f64,
    noise_std: f64,
    rng: &mut R,
) -> Vec<f64> {
    distances
        .iter()
        .map(|&d| {
            let mut w = transform.apply(d, min_dist, max_dist);
            if noise_std > 0.0 {
                w += rng.sample::<f64, _>(StandardNormal) * noise_std;
            }
            if w.is_nan() {
                0.0
            } else {
                w.clamp(0.0, 1.0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SimConfig, SimType};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::PI;

    fn walled_config(rays: usize) -> SimConfig {
        let mut config = SimConfig::default();
        config.perception.rays = rays;
        config.perception.fov = 1.0;
        config
    }

    fn sense_once(agent: &mut Agent, arena: &Arena, bodies: &[BodyView], see_agents: bool) {
        let metrics = Metrics::new();
        let ctx = PerceptionContext {
            arena,
            bodies,
            see_agents,
            metrics: &metrics,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        sense(agent, &ctx, &mut rng);
    }

    #[test]
    fn test_facing_east_sees_east_wall_ahead() {
        let config = walled_config(9);
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 0.0, &config);
        sense_once(&mut agent, &arena, &[], false);
        let labels = &agent.sensor.labels;
        assert_eq!(labels[4], RayLabel::Wall(WallSide::East));
        assert_eq!(labels[0], RayLabel::Wall(WallSide::West));
        assert_eq!(labels[8], RayLabel::Wall(WallSide::West));
        assert_eq!(labels[2], RayLabel::Wall(WallSide::North));
        assert_eq!(labels[6], RayLabel::Wall(WallSide::South));
    }

    #[test]
    fn test_distance_channel_to_wall() {
        let mut config = walled_config(9);
        config.perception.distance_transform = Some(DistanceTransform::MinMax);
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 0.0, &config);
        sense_once(&mut agent, &arena, &[], false);
        let d = agent.sensor.distances.as_ref().unwrap();
        // Eye sits at x = 260, east wall chord at x = 500.
        assert!((d[4] - 240.0).abs() < 1e-6);
        // Straight behind, west wall at x = 0.
        assert!((d[0] - 260.0).abs() < 1e-6);
    }

    #[test]
    fn test_open_arena_sees_nothing() {
        let mut config = walled_config(16);
        config.episode.sim_type = SimType::Nowalls;
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 1.0, &config);
        sense_once(&mut agent, &arena, &[], true);
        assert!(agent.sensor.labels.iter().all(|l| *l == RayLabel::Nothing));
    }

    #[test]
    fn test_nearest_agent_occludes() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.agents.count = 3;
        config.perception.rays = 5;
        config.perception.fov = 0.5;
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 0.0, &config);
        // Eye at (260, 250); near body 10 ahead, far body 20 ahead.
        let mut bodies = vec![
            BodyView {
                id: 1,
                position: Vec2::new(270.0, 250.0),
                radius: 10.0,
                mode: AgentMode::Explore,
            },
            BodyView {
                id: 2,
                position: Vec2::new(280.0, 250.0),
                radius: 10.0,
                mode: AgentMode::Exploit,
            },
        ];
        sense_once(&mut agent, &arena, &bodies, true);
        assert_eq!(agent.sensor.labels[2], RayLabel::AgentExplore);

        bodies[0].mode = AgentMode::Exploit;
        bodies[1].mode = AgentMode::Collide;
        sense_once(&mut agent, &arena, &bodies, true);
        assert_eq!(agent.sensor.labels[2], RayLabel::AgentExploit);
    }

    #[test]
    fn test_agents_beyond_range_are_invisible() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.agents.count = 2;
        config.perception.rays = 5;
        config.perception.vision_range = 50.0;
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(100.0, 250.0), 0.0, &config);
        let bodies = [BodyView {
            id: 1,
            position: Vec2::new(300.0, 250.0),
            radius: 10.0,
            mode: AgentMode::Explore,
        }];
        sense_once(&mut agent, &arena, &bodies, true);
        assert!(agent.sensor.labels.iter().all(|l| *l == RayLabel::Nothing));
    }

    #[test]
    fn test_self_is_not_perceived() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.agents.count = 2;
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 0.0, &config);
        let bodies = [BodyView::from(&agent)];
        sense_once(&mut agent, &arena, &bodies, true);
        assert!(agent.sensor.labels.iter().all(|l| *l == RayLabel::Nothing));
    }

    #[test]
    fn test_resolve_prefers_nearer_object() {
        let span = Span {
            left: -0.2,
            right: 0.2,
        };
        let far = Candidate {
            surface: Surface::Landmark {
                id: 0,
                center: Vec2::new(20.0, 0.0),
                radius: 1.0,
            },
            span,
            distance: 20.0,
        };
        let near = Candidate {
            surface: Surface::Agent {
                id: 1,
                center: Vec2::new(10.0, 0.0),
                radius: 1.0,
                mode: AgentMode::Explore,
            },
            span,
            distance: 10.0,
        };
        let objects = [far, near];
        let hit = resolve_ray(0.0, &[], &objects).unwrap();
        assert_eq!(hit.surface.label(), RayLabel::AgentExplore);
        assert!(resolve_ray(0.5, &[], &objects).is_none());
    }

    #[test]
    fn test_wrapping_span_catches_rear_rays() {
        let wall = |side, left, right| Candidate {
            surface: Surface::Wall {
                side,
                left: Vec2::ZERO,
                right: Vec2::ZERO,
            },
            span: Span { left, right },
            distance: 1.0,
        };
        let walls = [
            wall(WallSide::North, -2.0, -1.0),
            wall(WallSide::East, -1.0, 1.0),
            wall(WallSide::South, 1.0, 2.0),
            wall(WallSide::West, 2.0, -2.0),
        ];
        let hit = resolve_ray(PI, &walls, &[]).unwrap();
        assert_eq!(hit.surface.label(), RayLabel::Wall(WallSide::West));
        let hit = resolve_ray(0.0, &walls, &[]).unwrap();
        assert_eq!(hit.surface.label(), RayLabel::Wall(WallSide::East));
    }

    #[test]
    fn test_angle_noise_leaves_orientation() {
        let mut config = walled_config(8);
        config.perception.angle_noise_std = 0.1;
        let arena = Arena::new(&config);
        let mut agent = Agent::new(0, Vec2::new(250.0, 250.0), 1.25, &config);
        sense_once(&mut agent, &arena, &[], false);
        assert_eq!(agent.orientation, 1.25);
    }

    #[test]
    fn test_one_hot_layouts() {
        let labels = [
            RayLabel::Wall(WallSide::North),
            RayLabel::AgentExploit,
            RayLabel::Landmark,
            RayLabel::Nothing,
        ];
        let enc = encode_one_hot(&labels, ChannelLayout::WallsAndAgents);
        assert_eq!(enc.channels(), 6);
        assert_eq!(enc.get(0, 0), 1.0);
        assert_eq!(enc.get(5, 1), 1.0);
        assert_eq!(enc.as_slice().iter().sum::<f64>(), 2.0);

        let enc = encode_one_hot(&labels, ChannelLayout::Agents);
        assert_eq!(enc.channel(1), &[0.0, 1.0, 0.0, 0.0]);
        assert_eq!(enc.channel(0), &[0.0; 4]);
    }

    #[test]
    fn test_scale_rays() {
        let labels = [RayLabel::AgentExplore, RayLabel::AgentExploit];
        let mut enc = encode_one_hot(&labels, ChannelLayout::Agents);
        enc.scale_rays(&[0.5, 0.25]);
        assert_eq!(enc.get(0, 0), 0.5);
        assert_eq!(enc.get(1, 1), 0.25);
    }

    #[test]
    fn test_distance_weights_clipped() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let w = distance_weights(
            &[0.0, 10.0, 1e6],
            DistanceTransform::MaxWf,
            10.0,
            700.0,
            0.0,
            &mut rng,
        );
        assert_eq!(w[0], 1.0);
        assert!(w[1] > 0.0 && w[1] <= 1.0);
        assert_eq!(w[2], 0.0);
    }

    #[test]
    fn test_distance_transform_parse() {
        assert_eq!(
            "ssWF".parse::<DistanceTransform>().unwrap(),
            DistanceTransform::SsWf
        );
        assert!("bogus".parse::<DistanceTransform>().is_err());
        let minmax = DistanceTransform::MinMax.apply(355.0, 10.0, 700.0);
        assert!((minmax - 0.5).abs() < 1e-12);
    }
}
