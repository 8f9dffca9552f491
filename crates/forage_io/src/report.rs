//! Evaluation reports written by the CLI.

use crate::error::Result;
use crate::serialization::{json_digest, read_json_file, write_json_file};
use chrono::Utc;
use forage_core::config::{SimConfig, SimType};
use forage_core::simulation::{EpisodeResult, Objective};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub created_at: String,
    pub config_fingerprint: String,
    pub sim_type: SimType,
    pub controller: String,
    pub estimator: String,
    pub objective: Objective,
    /// Aggregated fitness over all episodes.
    pub fitness: f64,
    pub episodes: Vec<EpisodeResult>,
    /// SHA-256 over the episode results, for comparing runs.
    pub episodes_digest: String,
}

impl EvaluationReport {
    pub fn new(
        config: &SimConfig,
        controller: &str,
        estimator: &str,
        fitness: f64,
        episodes: Vec<EpisodeResult>,
    ) -> Result<Self> {
        let objective = episodes
            .first()
            .map(EpisodeResult::objective)
            .unwrap_or(Objective::Maximize);
        let episodes_digest = json_digest(&digest_view(&episodes))?;
        Ok(Self {
            created_at: Utc::now().to_rfc3339(),
            config_fingerprint: config.fingerprint(),
            sim_type: config.episode.sim_type,
            controller: controller.to_string(),
            estimator: estimator.to_string(),
            objective,
            fitness,
            episodes,
            episodes_digest,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_file(self, path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json_file(path)
    }
}

/// Episode fields that depend only on the simulation, not on wall time.
fn digest_view(episodes: &[EpisodeResult]) -> Vec<(u64, u64, Option<f64>, f64, Option<u64>)> {
    episodes
        .iter()
        .map(|e| {
            (
                e.seed,
                e.ticks_elapsed,
                e.terminal_distance,
                e.total_collected,
                e.first_contact_tick,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forage_core::controller::ConstantController;
    use forage_core::simulation::run_episode;

    fn episodes(config: &SimConfig) -> Vec<EpisodeResult> {
        (0..3)
            .map(|s| run_episode(config.with_seed(s), ConstantController::new(0.1)).unwrap())
            .collect()
    }

    #[test]
    fn test_digest_ignores_timing() {
        let mut config = SimConfig::default();
        config.episode.horizon = 30;
        let a = EvaluationReport::new(&config, "constant", "mean", 1.0, episodes(&config)).unwrap();
        let b = EvaluationReport::new(&config, "constant", "mean", 1.0, episodes(&config)).unwrap();
        assert_eq!(a.episodes_digest, b.episodes_digest);
        assert_eq!(a.objective, Objective::Minimize);
    }

    #[test]
    fn test_report_file_roundtrip() {
        let mut config = SimConfig::default();
        config.episode.sim_type = SimType::Nowalls;
        config.episode.horizon = 20;
        let report =
            EvaluationReport::new(&config, "constant", "median", 0.0, episodes(&config)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save(&path).unwrap();
        let loaded = EvaluationReport::load(&path).unwrap();
        assert_eq!(loaded.config_fingerprint, report.config_fingerprint);
        assert_eq!(loaded.episodes.len(), 3);
        assert_eq!(loaded.objective, Objective::Maximize);
        assert_eq!(loaded.episodes_digest, report.episodes_digest);
    }
}
