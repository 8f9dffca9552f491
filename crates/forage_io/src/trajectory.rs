//! Episode trajectory logging.
//!
//! A [`TrajectoryLog`] is a [`Recorder`] that buffers agent positions and
//! patch appearances, then writes them as gzip JSON (with run metadata) or
//! as a bare rkyv archive.

use crate::error::{IoError, Result};
use crate::persistence::{load_rkyv, save_rkyv};
use crate::serialization::{read_json_gz, write_json_gz};
use chrono::Utc;
use forage_core::config::{SimConfig, SimType};
use forage_core::recorder::Recorder;
use forage_data::{AgentRecord, PatchRecord, Trajectory, TrajectoryFrame};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run metadata stored next to the frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryMeta {
    /// RFC 3339 timestamp of the save.
    pub recorded_at: String,
    pub sim_type: SimType,
    pub config_fingerprint: String,
    pub agent_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFile {
    pub meta: TrajectoryMeta,
    pub trajectory: Trajectory,
}

/// On-disk format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryFormat {
    JsonGz,
    Rkyv,
}

impl TrajectoryFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rkyv") => TrajectoryFormat::Rkyv,
            _ => TrajectoryFormat::JsonGz,
        }
    }
}

pub struct TrajectoryLog {
    trajectory: Trajectory,
    sim_type: SimType,
    config_fingerprint: String,
    agent_count: usize,
}

impl TrajectoryLog {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            trajectory: Trajectory::new(
                config.episode.seed,
                config.arena.width,
                config.arena.height,
            ),
            sim_type: config.episode.sim_type,
            config_fingerprint: config.fingerprint(),
            agent_count: config.agents.count,
        }
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn into_trajectory(self) -> Trajectory {
        self.trajectory
    }

    fn meta(&self) -> TrajectoryMeta {
        TrajectoryMeta {
            recorded_at: Utc::now().to_rfc3339(),
            sim_type: self.sim_type,
            config_fingerprint: self.config_fingerprint.clone(),
            agent_count: self.agent_count,
        }
    }

    /// Writes the log in the format implied by `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match TrajectoryFormat::from_path(path) {
            TrajectoryFormat::Rkyv => save_rkyv(&self.trajectory, path),
            TrajectoryFormat::JsonGz => {
                let file = TrajectoryFile {
                    meta: self.meta(),
                    trajectory: self.trajectory.clone(),
                };
                write_json_gz(&file, path)
            }
        }
    }
}

impl Recorder for TrajectoryLog {
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

/// Loads a trajectory saved by [`TrajectoryLog::save`]. Rkyv archives carry
/// no metadata.
pub fn load_trajectory<P: AsRef<Path>>(path: P) -> Result<(Option<TrajectoryMeta>, Trajectory)> {
    let path = path.as_ref();
    match TrajectoryFormat::from_path(path) {
        TrajectoryFormat::Rkyv => Ok((None, load_rkyv(path)?)),
        TrajectoryFormat::JsonGz => {
            let file: TrajectoryFile = read_json_gz(path)?;
            if let Some(w) = file
                .trajectory
                .frames
                .windows(2)
                .find(|w| w[1].tick <= w[0].tick)
            {
                return Err(IoError::InvalidTrajectory(format!(
                    "tick {} follows tick {}",
                    w[1].tick, w[0].tick
                )));
            }
            Ok((Some(file.meta), file.trajectory))
        }
    }
}
