use super::{SimState, Simulation, StepOutcome, TerminationReason};
use crate::agent::Agent;
use crate::config::{PerceptionConfig, RegenerationPolicy};
use crate::controller::Controller;
use crate::perception::{self, BodyView, PerceptionContext, VisualEncoding};
use crate::recorder::Recorder;
use crate::systems::action::{self, ActionContext};
use crate::systems::collision::{self, CollisionContext};
use forage_data::{AgentMode, AgentRecord, ChannelLayout, Vec2};
use rand::Rng;
use std::time::Instant;

impl<C: Controller> Simulation<C> {
    /// Advances the episode by one tick.
    ///
    /// Order within a tick: transient reset, collision resolution,
    /// perception, recording, then one controller call and action per agent
    /// in id order. Stepping a terminated episode is a no-op.
    ///
    /// Every executed step counts in the metrics. A step that ends on contact
    /// does not advance the tick, so such episodes report one more metrics
    /// tick than `ticks_elapsed`.
    pub fn step<R: Recorder + ?Sized>(&mut self, recorder: &mut R) -> StepOutcome {
        match self.state {
            SimState::Terminated(reason) => return StepOutcome::Terminated(reason),
            SimState::Initializing => {
                tracing::warn!("Step called before placement; placing from config");
                self.place_random();
            }
            SimState::Running => {}
        }
        let start = Instant::now();
        self.flush_patches(recorder);

        for agent in &mut self.agents {
            agent.reset_transient();
        }
        self.resolve_collisions();
        self.perceive();

        let records: Vec<AgentRecord> = self.agents.iter().map(Agent::record).collect();
        recorder.record_tick(self.tick, &records);

        let contact = self.act();
        self.metrics
            .record_tick(start.elapsed(), self.agents.len(), self.patches.len());
        if let Some(reason) = contact {
            let outcome = self.terminate(reason);
            self.flush_patches(recorder);
            return outcome;
        }

        self.tick += 1;
        self.flush_patches(recorder);

        if self.tick >= self.config.episode.horizon {
            return self.terminate(TerminationReason::TimeLimitReached);
        }
        StepOutcome::Continue
    }

    fn resolve_collisions(&mut self) {
        let positions: Vec<Vec2> = self.agents.iter().map(|a| a.position).collect();
        self.spatial.build_parallel(&positions);
        let ctx = CollisionContext {
            arena: &self.arena,
            patches: &self.patches,
            capabilities: self.capabilities,
            spatial: &self.spatial,
            metrics: &self.metrics,
        };
        collision::resolve_collisions(&mut self.agents, &ctx);
    }

    fn perceive(&mut self) {
        let bodies: Vec<BodyView> = self.agents.iter().map(BodyView::from).collect();
        let ctx = PerceptionContext {
            arena: &self.arena,
            bodies: &bodies,
            see_agents: self.capabilities.multi_agent_perception,
            metrics: &self.metrics,
        };
        for agent in &mut self.agents {
            perception::sense(agent, &ctx, &mut self.rng);
        }
    }

    /// Runs controllers and applies actions. Returns a termination reason
    /// when an agent reached a patch in a terminate-on-contact variant.
    fn act(&mut self) -> Option<TerminationReason> {
        let action_ctx = ActionContext {
            action_noise_std: self.config.agents.action_noise_std,
        };
        let max_distance = self.config.max_distance();

        for i in 0..self.agents.len() {
            let visual = encode_visual(
                &self.agents[i],
                self.layout,
                &self.config.perception,
                max_distance,
                &mut self.rng,
            );
            let scalars = self.agents[i].scalar_inputs(self.config.agents.scalar_inputs);
            let hidden = self.hidden[i].clone();
            let (output, next_hidden) = self.controller.forward(&visual, &scalars, hidden);
            self.hidden[i] = next_hidden;

            if self.agents[i].mode == AgentMode::Exploit {
                self.agents[i].last_action = output;
                if self.capabilities.terminate_on_contact {
                    self.first_contact_tick.get_or_insert(self.tick);
                    return Some(TerminationReason::ResourceFound);
                }
                self.exploit(i);
            } else {
                action::apply_movement(&mut self.agents[i], output, &action_ctx, &mut self.rng);
            }
        }
        None
    }

    fn exploit(&mut self, i: usize) {
        self.first_contact_tick.get_or_insert(self.tick);
        let outcome = action::consume(&mut self.agents[i], &mut self.patches);
        let Some(id) = outcome.exhausted else {
            return;
        };

        let Some(idx) = self.patches.iter().position(|p| p.id == id) else {
            return;
        };
        let old = self.patches.remove(idx);
        tracing::debug!("Patch {} depleted at tick {}", old.id, self.tick);

        if self.config.resources.regenerate {
            let position = match self.config.resources.regeneration {
                RegenerationPolicy::Stationary => old.position,
                RegenerationPolicy::Random => self.random_patch_position(),
            };
            self.spawn_patch(position);
            self.metrics.record_regeneration();
        }
    }
}

/// One-hot encoding of the agent's last perception, weighted by distance
/// when a transform is configured.
fn encode_visual<R: Rng + ?Sized>(
    agent: &Agent,
    layout: ChannelLayout,
    config: &PerceptionConfig,
    max_distance: f64,
    rng: &mut R,
) -> VisualEncoding {
    let mut visual = perception::encode_one_hot(&agent.sensor.labels, layout);
    if let (Some(transform), Some(distances)) =
        (config.distance_transform, agent.sensor.distances.as_deref())
    {
        let weights = perception::distance_weights(
            distances,
            transform,
            agent.radius,
            max_distance,
            config.distance_noise_std,
            rng,
        );
        visual.scale_rays(&weights);
    }
    visual
}

#[cfg(test)]
mod tests {
    use super::super::{AgentPlacement, PatchPlacement, Scenario};
    use super::*;
    use crate::config::{SimConfig, SimType};
    use crate::controller::ConstantController;
    use crate::recorder::{InMemoryRecorder, NullRecorder};

    fn single_agent(config: SimConfig, pos: Vec2, orientation: f64, patch: Vec2, units: f64) -> Simulation<ConstantController> {
        let scenario = Scenario {
            agents: vec![AgentPlacement {
                position: pos,
                orientation,
            }],
            patches: vec![PatchPlacement {
                position: patch,
                units,
                quality: 1.0,
            }],
        };
        Simulation::from_scenario(config, ConstantController::new(0.0), &scenario).unwrap()
    }

    #[test]
    fn test_contact_terminates_walls_episode() {
        let mut sim = single_agent(
            SimConfig::default(),
            Vec2::new(100.0, 250.0),
            0.0,
            Vec2::new(250.0, 250.0),
            100.0,
        );
        let result = sim.run(&mut NullRecorder);
        assert_eq!(result.termination, TerminationReason::ResourceFound);
        assert_eq!(result.terminal_distance, Some(0.0));
        // Centre must enter the patch: (150 - 50) / 5 = 20 ticks of motion.
        assert_eq!(result.ticks_elapsed, 20);
        assert_eq!(result.first_contact_tick, Some(20));
        assert_eq!(result.fitness(), 20.0);
        assert_eq!(result.metrics.ticks, result.ticks_elapsed + 1);
    }

    #[test]
    fn test_timeout_reports_distance() {
        let mut config = SimConfig::default();
        config.episode.horizon = 10;
        let mut sim = single_agent(
            config,
            Vec2::new(100.0, 250.0),
            std::f64::consts::PI,
            Vec2::new(400.0, 250.0),
            100.0,
        );
        let result = sim.run(&mut NullRecorder);
        assert_eq!(result.termination, TerminationReason::TimeLimitReached);
        assert_eq!(result.ticks_elapsed, 10);
        assert_eq!(result.metrics.ticks, 10);
        let d = result.terminal_distance.unwrap();
        assert!(d > 300.0);
        assert!((result.fitness() - (10.0 + d)).abs() < 1e-9);
    }

    #[test]
    fn test_nowalls_agent_stops_and_consumes() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.episode.horizon = 50;
        let mut sim = single_agent(config, Vec2::new(200.0, 200.0), 0.0, Vec2::new(200.0, 200.0), 100.0);
        let result = sim.run(&mut NullRecorder);
        assert_eq!(result.total_collected, 50.0);
        assert_eq!(result.first_contact_tick, Some(0));
        assert_eq!(sim.agents[0].position, Vec2::new(200.0, 200.0));
        assert_eq!(sim.patches[0].units_remaining(), 50.0);
    }

    #[test]
    fn test_depleted_patch_removed_without_regeneration() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.episode.horizon = 10;
        let mut sim = single_agent(config, Vec2::new(200.0, 200.0), 0.0, Vec2::new(200.0, 200.0), 3.0);
        for _ in 0..3 {
            sim.step(&mut NullRecorder);
        }
        assert!(sim.patches.is_empty());
        assert_eq!(sim.total_collected(), 3.0);
        // Nothing left to consume: the agent starts moving again.
        sim.step(&mut NullRecorder);
        assert!(sim.agents[0].position.x > 200.0);
    }

    #[test]
    fn test_stationary_regeneration_records_patch() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.episode.horizon = 10;
        config.resources.regenerate = true;
        config.resources.units = [5, 5];
        let mut sim = single_agent(config, Vec2::new(200.0, 200.0), 0.0, Vec2::new(200.0, 200.0), 2.0);
        let mut rec = InMemoryRecorder::new(0, 500.0, 500.0);
        sim.step(&mut rec);
        sim.step(&mut rec);
        assert_eq!(sim.patches.len(), 1);
        let fresh = &sim.patches[0];
        assert_eq!(fresh.id, 1);
        assert_eq!(fresh.position, Vec2::new(200.0, 200.0));
        assert_eq!(fresh.created_at, 1);
        assert_eq!(rec.trajectory.patches.len(), 2);
        assert_eq!(sim.metrics.snapshot().regenerations, 1);
    }

    #[test]
    fn test_step_after_termination_is_noop() {
        let mut config = SimConfig::default();
        config.episode.horizon = 1;
        let mut sim = single_agent(config, Vec2::new(100.0, 250.0), 0.0, Vec2::new(400.0, 250.0), 10.0);
        assert_eq!(
            sim.step(&mut NullRecorder),
            StepOutcome::Terminated(TerminationReason::TimeLimitReached)
        );
        let pos = sim.agents[0].position;
        assert_eq!(
            sim.step(&mut NullRecorder),
            StepOutcome::Terminated(TerminationReason::TimeLimitReached)
        );
        assert_eq!(sim.agents[0].position, pos);
        assert_eq!(sim.tick(), 1);
    }

    #[test]
    fn test_recorder_sees_every_tick() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.episode.horizon = 7;
        let mut sim = single_agent(config, Vec2::new(100.0, 100.0), 0.0, Vec2::new(400.0, 400.0), 10.0);
        let mut rec = InMemoryRecorder::new(0, 500.0, 500.0);
        sim.run(&mut rec);
        let ticks: Vec<u64> = rec.trajectory.frames.iter().map(|f| f.tick).collect();
        assert_eq!(ticks, (0..7).collect::<Vec<_>>());
        // Eye position, one radius ahead of the body.
        assert_eq!(rec.trajectory.frames[0].agents[0].x, 110.0);
    }
}
