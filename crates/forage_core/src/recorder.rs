//! Trajectory recording hook.
//!
//! The driver calls [`Recorder::record_tick`] once per tick after perception
//! and [`Recorder::record_patch`] once per patch creation.

use forage_data::{AgentRecord, PatchRecord, Trajectory, TrajectoryFrame};

pub trait Recorder {
    fn record_tick(&mut self, tick: u64, agents: &[AgentRecord]);
    fn record_patch(&mut self, patch: &PatchRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record_tick(&mut self, _tick: u64, _agents: &[AgentRecord]) {}
    fn record_patch(&mut self, _patch: &PatchRecord) {}
}

/// Buffers a whole episode in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecorder {
    pub trajectory: Trajectory,
}

impl InMemoryRecorder {
    pub fn new(seed: u64, width: f64, height: f64) -> Self {
        Self {
            trajectory: Trajectory::new(seed, width, height),
        }
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }
}

impl Recorder for InMemoryRecorder {
    fn record_tick(&mut self, tick: u64, agents: &[AgentRecord]) {
        self.trajectory.frames.push(TrajectoryFrame {
            tick,
            agents: agents.to_vec(),
        });
    }

    fn record_patch(&mut self, patch: &PatchRecord) {
        self.trajectory.patches.push(patch.clone());
    }
}

impl<R: Recorder + ?Sized> Recorder for &mut R {
    fn record_tick(&mut self, tick: u64, agents: &[AgentRecord]) {
        (**self).record_tick(tick, agents);
    }

    fn record_patch(&mut self, patch: &PatchRecord) {
        (**self).record_patch(patch);
    }
}
