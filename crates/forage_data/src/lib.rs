//! # Forage Data
//!
//! Plain data types shared by the foraging simulation crates: planar
//! vectors, behavioural modes, perception labels and trajectory records.
//! Everything here is serializable with serde and archivable with rkyv.

pub mod data;

pub use data::entity::{AgentMode, Vec2};
pub use data::perception::{ChannelLayout, RayLabel, WallSide};
pub use data::record::{AgentRecord, PatchRecord, Trajectory, TrajectoryFrame};
