//! Per-tick systems operating on the agent list.

pub mod action;
pub mod collision;
