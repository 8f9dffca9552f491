//! Core data structures for the foraging simulation.

pub mod entity;
pub mod perception;
pub mod record;
