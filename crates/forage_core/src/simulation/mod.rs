//! Episode driver.
//!
//! A [`Simulation`] owns the arena, agents, patches, per-agent controller
//! state and the episode RNG. [`Simulation::step`] advances one tick and
//! [`Simulation::run`] steps until the episode terminates.

use crate::agent::Agent;
use crate::arena::Arena;
use crate::config::{Capabilities, SimConfig, SimType};
use crate::controller::Controller;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::recorder::Recorder;
use crate::resource::ResourcePatch;
use crate::spatial_hash::SpatialHash;
use forage_data::{ChannelLayout, PatchRecord, Vec2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod init;
pub mod update;

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TimeLimitReached,
    ResourceFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Initializing,
    Running,
    Terminated(TerminationReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Terminated(TerminationReason),
}

/// Direction of optimisation for an episode's fitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Minimize,
    Maximize,
}

/// Fixed starting pose of one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentPlacement {
    pub position: Vec2,
    pub orientation: f64,
}

/// Fixed patch with explicit contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchPlacement {
    pub position: Vec2,
    pub units: f64,
    pub quality: f64,
}

/// Explicit initial layout. Patches left empty are drawn from the config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub agents: Vec<AgentPlacement>,
    pub patches: Vec<PatchPlacement>,
}

/// Summary of a finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    pub seed: u64,
    pub sim_type: SimType,
    pub termination: TerminationReason,
    pub ticks_elapsed: u64,
    /// Distance from agent 0 to the first patch at termination, reported by
    /// the terminate-on-contact variants only.
    pub terminal_distance: Option<f64>,
    pub total_collected: f64,
    /// Tick of the first patch contact by any agent. `None` when no agent
    /// reached a patch before the horizon; callers that want a numeric score
    /// can substitute the horizon.
    pub first_contact_tick: Option<u64>,
    pub metrics: MetricsSnapshot,
}

impl EpisodeResult {
    pub fn objective(&self) -> Objective {
        if self.sim_type.capabilities(1).terminate_on_contact {
            Objective::Minimize
        } else {
            Objective::Maximize
        }
    }

    /// Search-time fitness.
    ///
    /// Walled variants score ticks to contact, plus the remaining distance
    /// when the patch was never reached. Open variants score total units.
    pub fn fitness(&self) -> f64 {
        match self.objective() {
            Objective::Minimize => {
                let ticks = self.ticks_elapsed as f64;
                match self.terminal_distance {
                    Some(d) if d > 0.0 => ticks + d,
                    _ => ticks,
                }
            }
            Objective::Maximize => self.total_collected,
        }
    }
}

pub struct Simulation<C: Controller> {
    config: SimConfig,
    capabilities: Capabilities,
    layout: ChannelLayout,
    pub arena: Arena,
    pub agents: Vec<Agent>,
    pub patches: Vec<ResourcePatch>,
    controller: C,
    hidden: Vec<C::Hidden>,
    rng: ChaCha8Rng,
    spatial: SpatialHash,
    pub metrics: Metrics,
    tick: u64,
    state: SimState,
    next_patch_id: usize,
    first_contact_tick: Option<u64>,
    terminal_distance: Option<f64>,
    pending_patches: Vec<PatchRecord>,
}

impl<C: Controller> Simulation<C> {
    /// Validates `config` and places agents and patches from the episode seed.
    pub fn new(config: SimConfig, controller: C) -> anyhow::Result<Self> {
        let mut sim = Self::empty(config, controller)?;
        sim.place_random();
        Ok(sim)
    }

    /// Builds an episode with an explicit layout. The agent count follows the
    /// scenario.
    pub fn from_scenario(
        mut config: SimConfig,
        controller: C,
        scenario: &Scenario,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !scenario.agents.is_empty(),
            "Scenario must place at least one agent"
        );
        config.agents.count = scenario.agents.len();
        let mut sim = Self::empty(config, controller)?;
        sim.place_scenario(scenario)?;
        Ok(sim)
    }

    fn empty(config: SimConfig, controller: C) -> anyhow::Result<Self> {
        config.validate()?;
        let capabilities = config.capabilities();
        let cell_size = (config.agents.radius * 4.0).max(1.0);
        Ok(Self {
            capabilities,
            layout: capabilities.channel_layout(),
            arena: Arena::new(&config),
            agents: Vec::with_capacity(config.agents.count),
            patches: Vec::with_capacity(config.resources.count),
            hidden: Vec::with_capacity(config.agents.count),
            rng: ChaCha8Rng::seed_from_u64(config.episode.seed),
            spatial: SpatialHash::new(cell_size, config.arena.width, config.arena.height),
            metrics: Metrics::new(),
            tick: 0,
            state: SimState::Initializing,
            next_patch_id: 0,
            first_contact_tick: None,
            terminal_distance: None,
            pending_patches: Vec::new(),
            controller,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn hidden(&self, agent: usize) -> Option<&C::Hidden> {
        self.hidden.get(agent)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SimState::Terminated(_))
    }

    pub fn first_contact_tick(&self) -> Option<u64> {
        self.first_contact_tick
    }

    pub fn total_collected(&self) -> f64 {
        self.agents.iter().map(|a| a.collected).sum()
    }

    /// Steps until termination and returns the episode summary.
    pub fn run<R: Recorder + ?Sized>(&mut self, recorder: &mut R) -> EpisodeResult {
        while !self.is_terminated() {
            self.step(recorder);
        }
        self.result()
    }

    /// Summary of the episode so far.
    pub fn result(&self) -> EpisodeResult {
        let termination = match self.state {
            SimState::Terminated(reason) => reason,
            _ => TerminationReason::TimeLimitReached,
        };
        EpisodeResult {
            seed: self.config.episode.seed,
            sim_type: self.config.episode.sim_type,
            termination,
            ticks_elapsed: self.tick,
            terminal_distance: self.terminal_distance,
            total_collected: self.total_collected(),
            first_contact_tick: self.first_contact_tick,
            metrics: self.metrics.snapshot(),
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> StepOutcome {
        if self.capabilities.terminate_on_contact {
            self.terminal_distance = Some(match reason {
                TerminationReason::ResourceFound => 0.0,
                TerminationReason::TimeLimitReached => self.distance_to_first_patch(),
            });
        }
        self.state = SimState::Terminated(reason);
        tracing::debug!(
            "Episode seed {} terminated at tick {}: {:?}",
            self.config.episode.seed,
            self.tick,
            reason
        );
        StepOutcome::Terminated(reason)
    }

    fn distance_to_first_patch(&self) -> f64 {
        match (self.agents.first(), self.patches.first()) {
            (Some(a), Some(p)) => a.position.distance(p.position),
            _ => self.config.max_distance(),
        }
    }

    fn flush_patches<R: Recorder + ?Sized>(&mut self, recorder: &mut R) {
        for record in self.pending_patches.drain(..) {
            recorder.record_patch(&record);
        }
    }
}

/// Runs one episode with no recording.
pub fn run_episode<C: Controller>(config: SimConfig, controller: C) -> anyhow::Result<EpisodeResult> {
    let mut sim = Simulation::new(config, controller)?;
    Ok(sim.run(&mut crate::recorder::NullRecorder))
}
