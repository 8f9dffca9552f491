//! Multi-episode evaluation.
//!
//! Episodes are independent and seeded `start_seed + e`, so they run on the
//! rayon pool and still aggregate to the same fitness on every run.

use forage_core::config::SimConfig;
use forage_core::controller::Controller;
use forage_core::simulation::{run_episode, EpisodeResult, Objective};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How per-episode fitness values are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    #[default]
    Mean,
    Median,
}

impl Estimator {
    pub fn name(self) -> &'static str {
        match self {
            Estimator::Mean => "mean",
            Estimator::Median => "median",
        }
    }
}

impl FromStr for Estimator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Estimator::Mean),
            "median" => Ok(Estimator::Median),
            other => anyhow::bail!("Unknown estimator '{other}'"),
        }
    }
}

/// Combines `values` with `estimator`. The median of an even count is the
/// mean of the two middle values.
pub fn aggregate(values: &[f64], estimator: Estimator) -> anyhow::Result<f64> {
    anyhow::ensure!(!values.is_empty(), "Cannot aggregate zero episodes");
    match estimator {
        Estimator::Mean => Ok(values.iter().sum::<f64>() / values.len() as f64),
        Estimator::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len().is_multiple_of(2) {
                Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
            } else {
                Ok(sorted[mid])
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub results: Vec<EpisodeResult>,
    pub fitness: f64,
    pub objective: Objective,
}

/// Runs `episodes` episodes of `config` in parallel, building one controller
/// per episode from its seed.
pub fn evaluate<C, F>(
    config: &SimConfig,
    episodes: usize,
    start_seed: u64,
    estimator: Estimator,
    make_controller: F,
) -> anyhow::Result<Evaluation>
where
    C: Controller,
    F: Fn(u64) -> C + Sync,
{
    anyhow::ensure!(episodes > 0, "At least one episode is required");
    config.validate()?;

    let results = (0..episodes)
        .into_par_iter()
        .map(|e| {
            let seed = start_seed.wrapping_add(e as u64);
            run_episode(config.with_seed(seed), make_controller(seed))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let fitnesses: Vec<f64> = results.iter().map(EpisodeResult::fitness).collect();
    let fitness = aggregate(&fitnesses, estimator)?;
    let objective = results[0].objective();
    tracing::debug!(
        "Evaluated {} episodes from seed {}: {} fitness {:.3}",
        episodes,
        start_seed,
        estimator.name(),
        fitness
    );
    Ok(Evaluation {
        results,
        fitness,
        objective,
    })
}

/// Scores every parameter vector of a population on the same episode seeds.
pub fn score_population<C, B>(
    config: &SimConfig,
    population: &[Vec<f64>],
    episodes: usize,
    start_seed: u64,
    estimator: Estimator,
    build: B,
) -> anyhow::Result<Vec<f64>>
where
    C: Controller + Clone + Sync,
    B: Fn(&[f64]) -> anyhow::Result<C> + Sync,
{
    population
        .par_iter()
        .map(|params| {
            let controller = build(params)?;
            let eval = evaluate(config, episodes, start_seed, estimator, |_| {
                controller.clone()
            })?;
            Ok(eval.fitness)
        })
        .collect()
}

/// Flattened input width an [`ElmanController`](forage_core::ElmanController)
/// needs for `config`.
pub fn controller_input_size(config: &SimConfig) -> usize {
    let layout = config.capabilities().channel_layout();
    layout.channel_count() * config.perception.rays + config.agents.scalar_inputs.width()
}
