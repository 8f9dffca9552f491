use super::{Scenario, SimState, Simulation};
use crate::agent::Agent;
use crate::controller::Controller;
use crate::geometry::circle_overlap;
use crate::resource::ResourcePatch;
use forage_data::Vec2;
use rand::Rng;
use std::f64::consts::TAU;

impl<C: Controller> Simulation<C> {
    pub(super) fn place_random(&mut self) {
        for i in 0..self.config.resources.count {
            let position = match (i, self.config.patch_position()) {
                (0, Some(p)) => p,
                _ => self.random_patch_position(),
            };
            self.spawn_patch(position);
        }
        for id in 0..self.config.agents.count {
            let (position, orientation) = self.random_agent_pose(id);
            self.push_agent(id, position, orientation);
        }
        self.state = SimState::Running;
        tracing::debug!(
            "Placed {} agents and {} patches for seed {}",
            self.agents.len(),
            self.patches.len(),
            self.config.episode.seed
        );
    }

    pub(super) fn place_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        if scenario.patches.is_empty() {
            for i in 0..self.config.resources.count {
                let position = match (i, self.config.patch_position()) {
                    (0, Some(p)) => p,
                    _ => self.random_patch_position(),
                };
                self.spawn_patch(position);
            }
        }
        for placement in &scenario.patches {
            anyhow::ensure!(
                placement.position.is_finite() && placement.units > 0.0 && placement.quality > 0.0,
                "Invalid patch placement {:?}",
                placement
            );
            let id = self.allocate_patch_id();
            let patch = ResourcePatch::new(
                id,
                placement.position,
                self.config.resources.radius,
                placement.units,
                placement.quality,
                self.tick,
            );
            self.pending_patches.push(patch.record());
            self.patches.push(patch);
        }
        for (id, placement) in scenario.agents.iter().enumerate() {
            anyhow::ensure!(
                placement.position.is_finite() && placement.orientation.is_finite(),
                "Invalid pose for agent {id}"
            );
            self.push_agent(id, placement.position, placement.orientation);
        }
        self.state = SimState::Running;
        Ok(())
    }

    fn push_agent(&mut self, id: usize, position: Vec2, orientation: f64) {
        self.agents
            .push(Agent::new(id, position, orientation, &self.config));
        self.hidden.push(self.controller.initial_hidden(id));
    }

    pub(super) fn allocate_patch_id(&mut self) -> usize {
        let id = self.next_patch_id;
        self.next_patch_id += 1;
        id
    }

    /// Samples a patch at `position`, stores it and queues its record.
    pub(super) fn spawn_patch(&mut self, position: Vec2) {
        let id = self.allocate_patch_id();
        let patch = ResourcePatch::sample(
            id,
            position,
            &self.config.resources,
            self.tick,
            &mut self.rng,
        );
        self.pending_patches.push(patch.record());
        self.patches.push(patch);
    }

    /// Uniform position keeping the patch inside the arena.
    pub(super) fn random_patch_position(&mut self) -> Vec2 {
        let r = self.config.resources.radius;
        let w = self.config.arena.width;
        let h = self.config.arena.height;
        let x = if w > 2.0 * r {
            self.rng.gen_range(r..w - r)
        } else {
            w / 2.0
        };
        let y = if h > 2.0 * r {
            self.rng.gen_range(r..h - r)
        } else {
            h / 2.0
        };
        Vec2::new(x, y)
    }

    /// Rejection-samples a pose clear of every patch and earlier agent.
    ///
    /// After `max_placement_retries` rejections the last sample is kept.
    fn random_agent_pose(&mut self, id: usize) -> (Vec2, f64) {
        let radius = self.config.agents.radius;
        let (lo, hi) = self.arena.spawn_bounds(radius);
        let max_retries = self.config.episode.max_placement_retries;
        let mut retries = 0u32;
        loop {
            let position = Vec2::new(
                self.rng.gen_range(lo.x..hi.x),
                self.rng.gen_range(lo.y..hi.y),
            );
            let orientation = self.rng.gen_range(0.0..TAU);

            let blocked = self
                .patches
                .iter()
                .any(|p| circle_overlap(position, radius, p.position, p.radius))
                || self
                    .agents
                    .iter()
                    .any(|a| circle_overlap(position, radius, a.position, a.radius));
            if !blocked {
                return (position, orientation);
            }

            retries += 1;
            if retries > max_retries {
                tracing::warn!(
                    "Agent {} placed overlapping after {} retries",
                    id,
                    max_retries
                );
                self.metrics.record_placement_overflow();
                return (position, orientation);
            }
        }
    }
}
