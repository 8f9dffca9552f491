use crate::data::entity::AgentMode;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Per-tick snapshot of one agent for offline plotting.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct AgentRecord {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub mode: AgentMode,
    /// Units collected since the start of the episode.
    pub collected: f64,
}

/// Static description of a resource patch, logged when the patch appears.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct PatchRecord {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Tick at which the patch was created.
    pub created_at: u64,
}

#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct TrajectoryFrame {
    pub tick: u64,
    pub agents: Vec<AgentRecord>,
}

/// Everything recorded over one episode.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct Trajectory {
    pub seed: u64,
    pub width: f64,
    pub height: f64,
    pub frames: Vec<TrajectoryFrame>,
    pub patches: Vec<PatchRecord>,
}

impl Trajectory {
    pub fn new(seed: u64, width: f64, height: f64) -> Self {
        Self {
            seed,
            width,
            height,
            ..Self::default()
        }
    }

    pub fn tick_count(&self) -> usize {
        self.frames.len()
    }

    /// Path of a single agent across all recorded frames.
    pub fn agent_path(&self, id: usize) -> Vec<(f64, f64)> {
        self.frames
            .iter()
            .filter_map(|f| f.agents.iter().find(|a| a.id == id))
            .map(|a| (a.x, a.y))
            .collect()
    }
}
