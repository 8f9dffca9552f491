//! # Forage Core
//!
//! The simulation engine for Forage - a 2-D multi-agent foraging testbed.
//!
//! This crate contains the deterministic episode logic, including:
//! - Geometry helpers in screen coordinates (y grows downwards)
//! - Agent kinematics with collision blocking
//! - Ray-cast perception of walls, landmarks and other agents
//! - Depletable resource patches with optional regeneration
//! - A fixed-order collision pipeline
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! A [`Simulation`] owns all episode state and a single seeded RNG. Each
//! tick runs the systems in a fixed order; controllers are stateless and
//! receive their hidden state from the driver, so independent episodes can
//! run in parallel with identical results.
//!
//! ## Example
//!
//! ```
//! use forage_core::config::{SimConfig, SimType};
//! use forage_core::controller::ConstantController;
//! use forage_core::simulation::run_episode;
//!
//! let mut config = SimConfig::default();
//! config.episode.sim_type = SimType::Nowalls;
//! config.episode.horizon = 100;
//!
//! let result = run_episode(config, ConstantController::new(0.0))?;
//! assert_eq!(result.ticks_elapsed, 100);
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Agent state and the movement integrator
pub mod agent;
/// Arena bounds, wall bodies and landmarks
pub mod arena;
/// Configuration management for episode parameters
pub mod config;
/// Controller interface and built-in policies
pub mod controller;
/// Vector and angle helpers
pub mod geometry;
/// Episode counters and logging setup
pub mod metrics;
/// Ray-cast perception and visual encodings
pub mod perception;
/// Trajectory recording hook
pub mod recorder;
/// Depletable resource patches
pub mod resource;
/// Episode driver and state machine
pub mod simulation;
/// Spatial hashing for proximity queries
pub mod spatial_hash;
/// Per-tick systems (collision, action)
pub mod systems;

pub use config::{Capabilities, SimConfig, SimType};
pub use controller::{ConstantController, Controller, ElmanController, RandomTurnController};
pub use metrics::{init_logging, Metrics, MetricsSnapshot};
pub use recorder::{InMemoryRecorder, NullRecorder, Recorder};
pub use simulation::{
    run_episode, EpisodeResult, Objective, Scenario, SimState, Simulation, StepOutcome,
    TerminationReason,
};
