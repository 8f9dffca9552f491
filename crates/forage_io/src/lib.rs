//! # Forage IO
//!
//! I/O and persistence layer for the Forage simulation.
//!
//! This crate provides:
//! - An error type that names the file and stage that failed
//! - JSON, gzip JSON and rkyv file helpers
//! - Trajectory logging for offline plotting
//! - Evaluation reports

/// Error type and result alias
pub mod error;
/// Rkyv archive persistence
pub mod persistence;
/// Evaluation report files
pub mod report;
/// JSON and gzip JSON files
pub mod serialization;
/// Trajectory recorder and its on-disk formats
pub mod trajectory;

pub use error::{IoError, Result};
pub use report::EvaluationReport;
pub use serialization::{json_digest, read_json_file, read_json_gz, write_json_file, write_json_gz};
pub use trajectory::{load_trajectory, TrajectoryLog, TrajectoryMeta};
