/// Performance measurement utilities
/// Every render is timed and summarized for the frame loop
pub mod profiling;

pub use profiling::{CounterSnapshot, RaycastCounters, RAYCAST_COUNTERS};

use std::time::{Duration, Instant};

/// Frames slower than this are logged as warnings
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        log::trace!("[PERF] {}: {}μs", self.name, elapsed.as_micros());
    }
}

/// Summary of one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Rays cast (one per pixel, or one per block in coarse mode)
    pub rays: u64,
    pub hits: u64,
    pub elapsed: Duration,
}

impl FrameStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.rays == 0 {
            return 0.0;
        }
        self.hits as f64 / self.rays as f64
    }

    pub fn over_budget(&self) -> bool {
        self.elapsed > FRAME_BUDGET
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_stats_ratio_and_budget() {
        let stats = FrameStats {
            rays: 200,
            hits: 50,
            elapsed: Duration::from_millis(20),
        };
        assert_eq!(stats.hit_ratio(), 0.25);
        assert!(stats.over_budget());
        assert_eq!(FrameStats::default().hit_ratio(), 0.0);
        assert!(!FrameStats::default().over_budget());
    }
}
