//! Configuration management for foraging episodes.
//!
//! A [`SimConfig`] is an immutable snapshot handed to one episode. It can be
//! built from defaults, from a sectioned `config.toml`, or from the flat
//! `KEY=VALUE` mapping used by experiment launch files.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [arena]
//! width = 500.0
//! height = 500.0
//!
//! [agents]
//! count = 1
//! max_vel = 5.0
//!
//! [perception]
//! rays = 8
//! fov = 0.4
//!
//! [resources]
//! position = [400.0, 400.0]
//! units = [100, 100]
//!
//! [episode]
//! horizon = 1000
//! seed = 42
//! sim_type = "walls"
//! ```

use crate::perception::DistanceTransform;
use forage_data::{ChannelLayout, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Environment variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimType {
    /// Walled arena, episode ends on first patch contact.
    #[default]
    Walls,
    /// Walled arena with circular landmarks, episode ends on first contact.
    WallsLandmarks,
    /// Open arena, agents forage until the horizon.
    Nowalls,
    /// Open arena with reflective agent-agent collisions.
    Basic,
}

impl FromStr for SimType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walls" | "target" => Ok(SimType::Walls),
            "walls_landmarks" | "landmarks" | "pinball" => Ok(SimType::WallsLandmarks),
            "nowalls" | "no_walls" | "target_nowalls" => Ok(SimType::Nowalls),
            "basic" => Ok(SimType::Basic),
            other => anyhow::bail!("Unrecognized simulation type '{other}'"),
        }
    }
}

/// Behaviour switches derived from the variant and the agent count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub has_walls: bool,
    pub has_landmarks: bool,
    pub multi_agent_perception: bool,
    pub terminate_on_contact: bool,
    pub reflective_collisions: bool,
}

impl Capabilities {
    pub fn channel_layout(&self) -> ChannelLayout {
        match (self.has_walls, self.multi_agent_perception) {
            (true, true) => ChannelLayout::WallsAndAgents,
            (true, false) => ChannelLayout::Walls,
            (false, _) => ChannelLayout::Agents,
        }
    }
}

impl SimType {
    pub fn capabilities(self, agent_count: usize) -> Capabilities {
        let walled = matches!(self, SimType::Walls | SimType::WallsLandmarks);
        Capabilities {
            has_walls: walled,
            has_landmarks: self == SimType::WallsLandmarks,
            multi_agent_perception: agent_count > 1,
            terminate_on_contact: walled,
            reflective_collisions: self == SimType::Basic,
        }
    }
}

/// Scalar values passed to the controller next to the visual encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalarInputs {
    #[default]
    OnResource,
    Acceleration,
    OnResourceAndAcceleration,
    /// A single constant zero.
    Constant,
}

impl FromStr for ScalarInputs {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_resource" => Ok(ScalarInputs::OnResource),
            "acceleration" => Ok(ScalarInputs::Acceleration),
            "on_resource_and_acceleration" | "both" => Ok(ScalarInputs::OnResourceAndAcceleration),
            "constant" | "none" => Ok(ScalarInputs::Constant),
            other => anyhow::bail!("Unrecognized scalar input set '{other}'"),
        }
    }
}

impl ScalarInputs {
    /// Number of scalars handed to the controller each tick.
    pub fn width(self) -> usize {
        match self {
            ScalarInputs::OnResourceAndAcceleration => 2,
            _ => 1,
        }
    }
}

/// Where a replacement patch appears after its predecessor is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationPolicy {
    #[default]
    Stationary,
    Random,
}

impl FromStr for RegenerationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stationary" | "same" => Ok(RegenerationPolicy::Stationary),
            "random" => Ok(RegenerationPolicy::Random),
            other => anyhow::bail!("Unrecognized regeneration policy '{other}'"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LandmarkConfig {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Arena geometry.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
    /// Extrusion of the perceived boundary corners beyond the arena.
    pub boundary_scale: f64,
    pub landmarks: Vec<LandmarkConfig>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            boundary_scale: 0.0,
            landmarks: Vec::new(),
        }
    }
}

/// Agent body and motor parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub count: usize,
    pub radius: f64,
    pub max_vel: f64,
    /// Units requested from a patch per exploiting tick.
    pub consumption: f64,
    /// Extra angular margin (radians) added to each side of a contact's
    /// blocking half-plane.
    pub extra_collision_block: f64,
    /// Action noise stdev as a fraction of the action range.
    pub action_noise_std: f64,
    pub scalar_inputs: ScalarInputs,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            count: 1,
            radius: 10.0,
            max_vel: 5.0,
            consumption: 1.0,
            extra_collision_block: 0.0,
            action_noise_std: 0.0,
            scalar_inputs: ScalarInputs::OnResource,
        }
    }
}

/// Ray-cast sensor parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PerceptionConfig {
    pub rays: usize,
    /// Field of view as a fraction of π on each side of the heading.
    pub fov: f64,
    pub vision_range: f64,
    /// Angular noise stdev as a fraction of a full turn.
    pub angle_noise_std: f64,
    /// Enables the distance channel when set.
    pub distance_transform: Option<DistanceTransform>,
    pub distance_noise_std: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            rays: 8,
            fov: 0.4,
            vision_range: 2000.0,
            angle_noise_std: 0.0,
            distance_transform: None,
            distance_noise_std: 0.0,
        }
    }
}

/// Resource patch parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ResourceConfig {
    pub count: usize,
    pub radius: f64,
    /// Fixed centre of the first patch; random when absent.
    pub position: Option<[f64; 2]>,
    /// Unit range `[min, max)`.
    pub units: [u32; 2],
    /// Quality range `[min, max]`.
    pub quality: [f64; 2],
    pub regenerate: bool,
    pub regeneration: RegenerationPolicy,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            count: 1,
            radius: 50.0,
            position: None,
            units: [100, 100],
            quality: [1.0, 1.0],
            regenerate: false,
            regeneration: RegenerationPolicy::Stationary,
        }
    }
}

impl ResourceConfig {
    /// Inclusive unit range drawn from the configured `[min, max)`.
    /// An empty range collapses to `min`.
    pub fn unit_range(&self) -> (u32, u32) {
        let [min, max] = self.units;
        (min, if max <= min { min } else { max - 1 })
    }

    /// Quality range with `max` raised to `min` when inverted.
    pub fn quality_range(&self) -> (f64, f64) {
        let [min, max] = self.quality;
        (min, max.max(min))
    }
}

/// Episode-level parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EpisodeConfig {
    pub horizon: u64,
    pub seed: u64,
    pub sim_type: SimType,
    pub max_placement_retries: u32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            horizon: 1000,
            seed: 0,
            sim_type: SimType::Walls,
            max_placement_retries: 10,
        }
    }
}

/// Complete configuration of one episode.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimConfig {
    pub arena: ArenaConfig,
    pub agents: AgentConfig,
    pub perception: PerceptionConfig,
    pub resources: ResourceConfig,
    pub episode: EpisodeConfig,
}

impl SimConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` describing the
    /// first failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        let a = &self.arena;
        anyhow::ensure!(
            a.width.is_finite() && a.width > 0.0,
            "Arena width must be positive"
        );
        anyhow::ensure!(
            a.height.is_finite() && a.height > 0.0,
            "Arena height must be positive"
        );
        anyhow::ensure!(
            a.boundary_scale.is_finite() && a.boundary_scale >= 0.0,
            "Boundary scale must be non-negative"
        );
        for lm in &a.landmarks {
            anyhow::ensure!(lm.radius > 0.0, "Landmark radius must be positive");
            anyhow::ensure!(
                lm.x.is_finite() && lm.y.is_finite(),
                "Landmark position must be finite"
            );
        }
        anyhow::ensure!(
            a.landmarks.is_empty() || self.episode.sim_type == SimType::WallsLandmarks,
            "Landmarks require the walls_landmarks simulation type"
        );

        let ag = &self.agents;
        anyhow::ensure!(ag.count > 0, "At least one agent is required");
        anyhow::ensure!(ag.radius > 0.0, "Agent radius must be positive");
        anyhow::ensure!(
            a.width > 4.0 * ag.radius && a.height > 4.0 * ag.radius,
            "Arena too small for agent radius {}",
            ag.radius
        );
        anyhow::ensure!(
            ag.max_vel.is_finite() && ag.max_vel > 0.0,
            "Maximum velocity must be positive and finite"
        );
        anyhow::ensure!(ag.consumption >= 0.0, "Consumption must be non-negative");
        anyhow::ensure!(
            ag.extra_collision_block >= 0.0 && ag.extra_collision_block < std::f64::consts::FRAC_PI_2,
            "Extra collision block must be in [0, pi/2)"
        );
        anyhow::ensure!(ag.action_noise_std >= 0.0, "Action noise must be non-negative");

        let p = &self.perception;
        anyhow::ensure!(p.rays > 0, "At least one perception ray is required");
        anyhow::ensure!(
            p.fov > 0.0 && p.fov <= 1.0,
            "Field of view must be in (0, 1]"
        );
        anyhow::ensure!(p.vision_range > 0.0, "Vision range must be positive");
        anyhow::ensure!(
            p.angle_noise_std >= 0.0 && p.distance_noise_std >= 0.0,
            "Perception noise must be non-negative"
        );

        let r = &self.resources;
        anyhow::ensure!(r.count > 0, "At least one resource patch is required");
        anyhow::ensure!(r.radius > 0.0, "Patch radius must be positive");
        anyhow::ensure!(r.units[0] > 0, "Patches must hold at least one unit");
        anyhow::ensure!(r.quality[0] > 0.0, "Patch quality must be positive");
        if let Some([x, y]) = r.position {
            anyhow::ensure!(
                (0.0..=a.width).contains(&x) && (0.0..=a.height).contains(&y),
                "Patch position ({x}, {y}) lies outside the arena"
            );
        }

        anyhow::ensure!(self.episode.horizon > 0, "Horizon must be positive");
        Ok(())
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from a flat key-value mapping, starting from defaults.
    ///
    /// Unknown keys are ignored. Malformed values are errors.
    pub fn from_flat_map(map: &BTreeMap<String, String>) -> anyhow::Result<Self> {
        let mut c = Self::default();
        for (key, raw) in map {
            let value = raw.trim();
            match key.as_str() {
                "ENV_WIDTH" => c.arena.width = parse_num(key, value)?,
                "ENV_HEIGHT" => c.arena.height = parse_num(key, value)?,
                "BOUNDARY_SCALE" => c.arena.boundary_scale = parse_num(key, value)?,
                "N" => c.agents.count = parse_num(key, value)?,
                "T" => c.episode.horizon = parse_num(key, value)?,
                "SEED" => c.episode.seed = parse_num(key, value)?,
                "SIM_TYPE" => c.episode.sim_type = value.parse()?,
                "RADIUS_AGENT" => c.agents.radius = parse_num(key, value)?,
                "MAXIMUM_VELOCITY" => c.agents.max_vel = parse_num(key, value)?,
                "AGENT_CONSUMPTION" => c.agents.consumption = parse_num(key, value)?,
                "EXTRA_COLLISION_BLOCK" => c.agents.extra_collision_block = parse_num(key, value)?,
                "ACTION_NOISE_STD" => c.agents.action_noise_std = parse_num(key, value)?,
                "SCALAR_INPUTS" => c.agents.scalar_inputs = value.parse()?,
                "VISUAL_FIELD_RESOLUTION" => c.perception.rays = parse_num(key, value)?,
                "AGENT_FOV" => c.perception.fov = parse_num(key, value)?,
                "VISION_RANGE" => c.perception.vision_range = parse_num(key, value)?,
                "PERCEP_ANGLE_NOISE_STD" => c.perception.angle_noise_std = parse_num(key, value)?,
                "PERCEP_DIST_NOISE_STD" => c.perception.distance_noise_std = parse_num(key, value)?,
                "VIS_TRANSFORM" => {
                    c.perception.distance_transform = if value.is_empty() {
                        None
                    } else {
                        Some(value.parse()?)
                    }
                }
                "N_RESOURCES" => c.resources.count = parse_num(key, value)?,
                "RADIUS_RESOURCE" => c.resources.radius = parse_num(key, value)?,
                "MIN_RESOURCE_PER_PATCH" => c.resources.units[0] = parse_num(key, value)?,
                "MAX_RESOURCE_PER_PATCH" => c.resources.units[1] = parse_num(key, value)?,
                "MIN_RESOURCE_QUALITY" => c.resources.quality[0] = parse_num(key, value)?,
                "MAX_RESOURCE_QUALITY" => c.resources.quality[1] = parse_num(key, value)?,
                "REGENERATE_PATCHES" => c.resources.regenerate = parse_flag(key, value)?,
                "REGENERATION_POLICY" => c.resources.regeneration = value.parse()?,
                "RESOURCE_POS" => c.resources.position = Some(parse_pair(key, value)?),
                _ => tracing::debug!(key = key.as_str(), "Ignoring unknown config key"),
            }
        }
        c.validate()?;
        Ok(c)
    }

    /// Parses `KEY=VALUE` lines. Blank lines and `#` comments are skipped and
    /// values may be quoted.
    pub fn parse_flat(content: &str) -> anyhow::Result<Self> {
        let mut map = BTreeMap::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("Line {}: expected KEY=VALUE, got '{line}'", lineno + 1);
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            map.insert(key.trim().to_string(), value.to_string());
        }
        Self::from_flat_map(&map)
    }

    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.arena).as_bytes());
        hasher.update(format!("{:?}", self.agents).as_bytes());
        hasher.update(format!("{:?}", self.perception).as_bytes());
        hasher.update(format!("{:?}", self.resources).as_bytes());
        hasher.update(format!("{:?}", self.episode).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Copy of this config bound to another episode seed.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        let mut c = self.clone();
        c.episode.seed = seed;
        c
    }

    pub fn capabilities(&self) -> Capabilities {
        self.episode.sim_type.capabilities(self.agents.count)
    }

    pub fn patch_position(&self) -> Option<Vec2> {
        self.resources.position.map(|[x, y]| Vec2::new(x, y))
    }

    /// Largest distance the sensor can report inside the arena.
    pub fn max_distance(&self) -> f64 {
        self.arena.width.hypot(self.arena.height)
    }
}

fn parse_num<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value '{value}' for {key}: {e}"))
}

fn parse_flag(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => anyhow::bail!("Invalid flag '{value}' for {key}"),
    }
}

fn parse_pair(key: &str, value: &str) -> anyhow::Result<[f64; 2]> {
    let cleaned = value.trim_matches(|c| c == '(' || c == ')' || c == '[' || c == ']');
    let parts: Vec<&str> = cleaned.split(',').map(str::trim).collect();
    anyhow::ensure!(parts.len() == 2, "Expected 'x,y' for {key}, got '{value}'");
    Ok([parse_num(key, parts[0])?, parse_num(key, parts[1])?])
}
