use forage_core::config::{SimConfig, SimType};
use forage_core::controller::{ConstantController, Controller};
use forage_core::simulation::{AgentPlacement, PatchPlacement, Scenario, Simulation};
use forage_data::Vec2;

#[allow(dead_code)]
pub struct ScenarioBuilder {
    config: SimConfig,
    scenario: Scenario,
}

#[allow(dead_code)]
impl ScenarioBuilder {
    pub fn new(sim_type: SimType) -> Self {
        let mut config = SimConfig::default();
        config.episode.sim_type = sim_type;
        Self {
            config,
            scenario: Scenario::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.episode.seed = seed;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut SimConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn with_agent(mut self, x: f64, y: f64, orientation: f64) -> Self {
        self.scenario.agents.push(AgentPlacement {
            position: Vec2::new(x, y),
            orientation,
        });
        self
    }

    pub fn with_patch(mut self, x: f64, y: f64, units: f64, quality: f64) -> Self {
        self.scenario.patches.push(PatchPlacement {
            position: Vec2::new(x, y),
            units,
            quality,
        });
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn build<C: Controller>(self, controller: C) -> Simulation<C> {
        Simulation::from_scenario(self.config, controller, &self.scenario)
            .expect("scenario should be valid")
    }

    pub fn build_constant(self, action: f64) -> Simulation<ConstantController> {
        self.build(ConstantController::new(action))
    }
}
