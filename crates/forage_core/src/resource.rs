//! Depletable resource patches.

use crate::config::ResourceConfig;
use forage_data::{PatchRecord, Vec2};
use rand::Rng;

/// Lifecycle state of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    Active,
    Depleted,
}

/// A circular patch holding a finite number of units.
///
/// `quality` caps how many units a single agent can extract per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePatch {
    pub id: usize,
    pub position: Vec2,
    pub radius: f64,
    pub quality: f64,
    pub units_initial: f64,
    units_remaining: f64,
    pub created_at: u64,
}

impl ResourcePatch {
    pub fn new(id: usize, position: Vec2, radius: f64, units: f64, quality: f64, created_at: u64) -> Self {
        let units = units.max(0.0);
        Self {
            id,
            position,
            radius,
            quality: quality.max(0.0),
            units_initial: units,
            units_remaining: units,
            created_at,
        }
    }

    /// Draws units and quality from the configured ranges.
    pub fn sample<R: Rng>(
        id: usize,
        position: Vec2,
        config: &ResourceConfig,
        created_at: u64,
        rng: &mut R,
    ) -> Self {
        let (u_min, u_max) = config.unit_range();
        let (q_min, q_max) = config.quality_range();
        let units = rng.gen_range(u_min..=u_max) as f64;
        let quality = if q_max > q_min {
            rng.gen_range(q_min..=q_max)
        } else {
            q_min
        };
        Self::new(id, position, config.radius, units, quality, created_at)
    }

    #[inline]
    pub fn units_remaining(&self) -> f64 {
        self.units_remaining
    }

    pub fn state(&self) -> PatchState {
        if self.units_remaining > 0.0 {
            PatchState::Active
        } else {
            PatchState::Depleted
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.state() == PatchState::Depleted
    }

    /// Extracts up to `requested` units.
    ///
    /// The grant is capped first by `quality` and then by the units left.
    /// Returns the granted amount and whether the patch is now empty. A
    /// non-positive request grants nothing.
    pub fn deplete(&mut self, requested: f64) -> (f64, bool) {
        if requested.is_nan() || requested <= 0.0 {
            return (0.0, self.is_depleted());
        }
        let granted = requested.min(self.quality).min(self.units_remaining);
        self.units_remaining = (self.units_remaining - granted).max(0.0);
        (granted, self.is_depleted())
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) <= self.radius
    }

    pub fn record(&self) -> PatchRecord {
        PatchRecord {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            created_at: self.created_at,
        }
    }
}
