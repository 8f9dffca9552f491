use forage_data::Vec2;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

#[derive(Clone, Debug, Default)]
/// Uniform grid index over agent positions, rebuilt once per tick.
///
/// Entities are stored in offset-indexed cell lists: `cell_offsets[i]..
/// cell_offsets[i+1]` addresses the entries of cell `i` in
/// `entity_indices`. Positions outside the arena are clamped into the
/// border cells so stray agents are still found by nearby queries.
///
/// # Examples
/// ```
/// use forage_core::spatial_hash::SpatialHash;
/// use forage_data::Vec2;
///
/// let mut spatial = SpatialHash::new(20.0, 100.0, 100.0);
/// spatial.build_parallel(&[Vec2::new(15.0, 15.0), Vec2::new(85.0, 85.0)]);
///
/// let mut nearby = Vec::new();
/// spatial.query_into(10.0, 10.0, 10.0, &mut nearby);
/// assert_eq!(nearby, vec![0]);
/// ```
pub struct SpatialHash {
    pub cell_size: f64,
    pub width: f64,
    pub height: f64,
    pub cols: usize,
    pub rows: usize,
    pub cell_offsets: Vec<usize>,
    pub entity_indices: Vec<usize>,
}

impl SpatialHash {
    /// Creates an empty hash.
    ///
    /// # Parameters
    /// - `cell_size`: Width/height of each grid cell in arena units
    /// - `width`, `height`: Arena extent
    pub fn new(cell_size: f64, width: f64, height: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            width,
            height,
            cols,
            rows,
            cell_offsets: vec![0; cols * rows + 1],
            entity_indices: Vec::new(),
        }
    }

    #[inline]
    fn clamp_col(&self, x: f64) -> usize {
        ((x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1)
    }

    #[inline]
    fn clamp_row(&self, y: f64) -> usize {
        ((y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1)
    }

    /// Flat cell index of a position, or `None` for non-finite input.
    #[inline]
    pub fn get_cell_idx(&self, x: f64, y: f64) -> Option<usize> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(self.clamp_row(y) * self.cols + self.clamp_col(x))
    }

    pub fn build_parallel(&mut self, positions: &[Vec2]) {
        let cell_count = self.cols * self.rows;

        let atomic_counts: Vec<AtomicUsize> =
            (0..cell_count).map(|_| AtomicUsize::new(0)).collect();
        positions.par_iter().for_each(|p| {
            if let Some(idx) = self.get_cell_idx(p.x, p.y) {
                atomic_counts[idx].fetch_add(1, AtomicOrdering::Relaxed);
            }
        });
        let counts: Vec<usize> = atomic_counts.into_iter().map(|a| a.into_inner()).collect();

        self.cell_offsets.resize(cell_count + 1, 0);
        let mut total = 0;
        for (i, &count) in counts.iter().enumerate() {
            self.cell_offsets[i] = total;
            total += count;
        }
        self.cell_offsets[cell_count] = total;

        self.entity_indices.clear();
        self.entity_indices.resize(total, 0);
        let mut cursor = self.cell_offsets[..cell_count].to_vec();
        for (entity_idx, p) in positions.iter().enumerate() {
            if let Some(cell_idx) = self.get_cell_idx(p.x, p.y) {
                self.entity_indices[cursor[cell_idx]] = entity_idx;
                cursor[cell_idx] += 1;
            }
        }
    }

    /// Visits every entity in the cells overlapping the query square.
    ///
    /// Candidates still need an exact distance check.
    pub fn query_callback<F>(&self, x: f64, y: f64, radius: f64, mut callback: F)
    where
        F: FnMut(usize),
    {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let (min_cx, max_cx) = (self.clamp_col(x - radius), self.clamp_col(x + radius));
        let (min_cy, max_cy) = (self.clamp_row(y - radius), self.clamp_row(y + radius));

        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                let cell_idx = cy * self.cols + cx;
                let start = self.cell_offsets[cell_idx];
                let end = self.cell_offsets[cell_idx + 1];
                for &entity_idx in &self.entity_indices[start..end] {
                    callback(entity_idx);
                }
            }
        }
    }

    pub fn query_into(&self, x: f64, y: f64, radius: f64, out: &mut Vec<usize>) {
        self.query_callback(x, y, radius, |idx| out.push(idx));
    }
}
