/// Instrumentation for the raycast and paging hot paths
/// Counters only move when the `profiling` feature is enabled
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters shared by every render worker
pub struct RaycastCounters {
    // Raycast counters
    pub rays_cast: AtomicU64,
    pub rays_hit: AtomicU64,
    pub dda_steps: AtomicU64,
    pub frames: AtomicU64,

    // Paging counters
    pub chunks_loaded: AtomicU64,
    pub chunks_generated: AtomicU64,
    pub chunks_saved: AtomicU64,
}

impl RaycastCounters {
    pub const fn new() -> Self {
        Self {
            rays_cast: AtomicU64::new(0),
            rays_hit: AtomicU64::new(0),
            dda_steps: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            chunks_loaded: AtomicU64::new(0),
            chunks_generated: AtomicU64::new(0),
            chunks_saved: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.rays_cast.store(0, Ordering::Relaxed);
        self.rays_hit.store(0, Ordering::Relaxed);
        self.dda_steps.store(0, Ordering::Relaxed);
        self.frames.store(0, Ordering::Relaxed);
        self.chunks_loaded.store(0, Ordering::Relaxed);
        self.chunks_generated.store(0, Ordering::Relaxed);
        self.chunks_saved.store(0, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            rays_cast: self.rays_cast.load(Ordering::Relaxed),
            rays_hit: self.rays_hit.load(Ordering::Relaxed),
            dda_steps: self.dda_steps.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            chunks_loaded: self.chunks_loaded.load(Ordering::Relaxed),
            chunks_generated: self.chunks_generated.load(Ordering::Relaxed),
            chunks_saved: self.chunks_saved.load(Ordering::Relaxed),
        }
    }
}

impl Default for RaycastCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub rays_cast: u64,
    pub rays_hit: u64,
    pub dda_steps: u64,
    pub frames: u64,
    pub chunks_loaded: u64,
    pub chunks_generated: u64,
    pub chunks_saved: u64,
}

impl CounterSnapshot {
    /// Average DDA steps per cast ray
    pub fn steps_per_ray(&self) -> f64 {
        if self.rays_cast == 0 {
            return 0.0;
        }
        self.dda_steps as f64 / self.rays_cast as f64
    }

    /// Log formatted report
    pub fn log_report(&self) {
        log::info!(
            "raycast: {} frames, {} rays, {} hits, {:.2} steps/ray",
            self.frames,
            self.rays_cast,
            self.rays_hit,
            self.steps_per_ray()
        );
        log::info!(
            "paging: {} loaded, {} generated, {} saved",
            self.chunks_loaded,
            self.chunks_generated,
            self.chunks_saved
        );
    }
}

/// Global raycast counters instance
pub static RAYCAST_COUNTERS: RaycastCounters = RaycastCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
