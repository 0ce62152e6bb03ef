/// Performance measurement utilities
/// Each pipeline stage is timed so the debug overlay can show where a frame goes
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

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
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Statistics for the most recent frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Triangles handed to the vertex stage, including near-clip splits.
    pub triangles: usize,
    /// Triangles that survived culling and reached the rasterizer.
    pub active_triangles: usize,
    /// Fragments stored across all fragment lists after rasterization.
    pub fragments: usize,
    pub vertex_time: Duration,
    pub raster_time: Duration,
    pub composite_time: Duration,
    pub encode_time: Duration,
    pub frame_time: Duration,
}

impl FrameStats {
    /// Share of the frame spent in `stage`, in percent.
    fn percent(&self, stage: Duration) -> f64 {
        let total = self.frame_time.as_secs_f64();
        if total > 0.0 {
            stage.as_secs_f64() / total * 100.0
        } else {
            0.0
        }
    }

    /// Multi-line summary for the debug overlay.
    pub fn summary(&self) -> String {
        format!(
            "tris {}/{} frags {}\n\
             vertex {:6.2}ms ({:4.1}%)\n\
             raster {:6.2}ms ({:4.1}%)\n\
             shade  {:6.2}ms ({:4.1}%)\n\
             encode {:6.2}ms ({:4.1}%)\n\
             frame  {:6.2}ms",
            self.active_triangles,
            self.triangles,
            self.fragments,
            self.vertex_time.as_secs_f64() * 1000.0,
            self.percent(self.vertex_time),
            self.raster_time.as_secs_f64() * 1000.0,
            self.percent(self.raster_time),
            self.composite_time.as_secs_f64() * 1000.0,
            self.percent(self.composite_time),
            self.encode_time.as_secs_f64() * 1000.0,
            self.percent(self.encode_time),
            self.frame_time.as_secs_f64() * 1000.0,
        )
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
