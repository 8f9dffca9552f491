//! # Forage
//!
//! Episode runner for the Forage simulation. The engine lives in
//! `forage_core`; this crate adds parallel multi-episode evaluation.

pub mod runner;

pub use forage_core::{
    config::SimConfig, controller::Controller, simulation::EpisodeResult, simulation::Simulation,
};
pub use runner::{aggregate, evaluate, score_population, Estimator, Evaluation};
