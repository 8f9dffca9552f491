//! Episode counters and structured logging setup.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters collected over one episode.
pub struct Metrics {
    tick_count: AtomicU64,
    collisions: AtomicU64,
    degenerate_rays: AtomicU64,
    regenerations: AtomicU64,
    placement_overflows: AtomicU64,
    start_time: Instant,
}

/// Plain copy of [`Metrics`] for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub collisions: u64,
    pub degenerate_rays: u64,
    pub regenerations: u64,
    pub placement_overflows: u64,
    pub elapsed_ms: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
            degenerate_rays: AtomicU64::new(0),
            regenerations: AtomicU64::new(0),
            placement_overflows: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(&self, duration: Duration, agents: usize, patches: usize) {
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;

        // Log at debug level every 1000 ticks
        if tick.is_multiple_of(1000) {
            tracing::debug!(
                tick = tick,
                agents = agents,
                patches = patches,
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    pub fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degenerate_ray(&self) {
        self.degenerate_rays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_regeneration(&self) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placement_overflow(&self) {
        self.placement_overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.tick_count(),
            collisions: self.collisions.load(Ordering::Relaxed),
            degenerate_rays: self.degenerate_rays.load(Ordering::Relaxed),
            regenerations: self.regenerations.load(Ordering::Relaxed),
            placement_overflows: self.placement_overflows.load(Ordering::Relaxed),
            elapsed_ms: self.elapsed().as_millis() as u64,
        }
    }
}

/// Initialize tracing subscriber for logging.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )
    .ok();
}
