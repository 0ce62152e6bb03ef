/// Instrumentation for microoptimization
/// Global call counters for the hot paths of the render pipeline
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe performance counters for function call tracking
pub struct FunctionCounters {
    // Vertex stage counters
    pub vertex_shader_calls: AtomicU64,
    pub triangles_frustum_culled: AtomicU64,
    pub triangles_backface_culled: AtomicU64,
    pub triangles_near_clipped: AtomicU64,

    // Rasterization counters
    pub pixels_tested: AtomicU64,
    pub fragments_inserted: AtomicU64,
    pub fragments_occluded: AtomicU64,

    // Compositing counters
    pub fragments_shaded: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            vertex_shader_calls: AtomicU64::new(0),
            triangles_frustum_culled: AtomicU64::new(0),
            triangles_backface_culled: AtomicU64::new(0),
            triangles_near_clipped: AtomicU64::new(0),
            pixels_tested: AtomicU64::new(0),
            fragments_inserted: AtomicU64::new(0),
            fragments_occluded: AtomicU64::new(0),
            fragments_shaded: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.vertex_shader_calls.store(0, Ordering::Relaxed);
        self.triangles_frustum_culled.store(0, Ordering::Relaxed);
        self.triangles_backface_culled.store(0, Ordering::Relaxed);
        self.triangles_near_clipped.store(0, Ordering::Relaxed);
        self.pixels_tested.store(0, Ordering::Relaxed);
        self.fragments_inserted.store(0, Ordering::Relaxed);
        self.fragments_occluded.store(0, Ordering::Relaxed);
        self.fragments_shaded.store(0, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            vertex_shader_calls: self.vertex_shader_calls.load(Ordering::Relaxed),
            triangles_frustum_culled: self.triangles_frustum_culled.load(Ordering::Relaxed),
            triangles_backface_culled: self.triangles_backface_culled.load(Ordering::Relaxed),
            triangles_near_clipped: self.triangles_near_clipped.load(Ordering::Relaxed),
            pixels_tested: self.pixels_tested.load(Ordering::Relaxed),
            fragments_inserted: self.fragments_inserted.load(Ordering::Relaxed),
            fragments_occluded: self.fragments_occluded.load(Ordering::Relaxed),
            fragments_shaded: self.fragments_shaded.load(Ordering::Relaxed),
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub vertex_shader_calls: u64,
    pub triangles_frustum_culled: u64,
    pub triangles_backface_culled: u64,
    pub triangles_near_clipped: u64,
    pub pixels_tested: u64,
    pub fragments_inserted: u64,
    pub fragments_occluded: u64,
    pub fragments_shaded: u64,
}

impl CounterSnapshot {
    /// Formatted report
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Pipeline Counters ===");
        let _ = writeln!(out, "Vertex Stage:");
        let _ = writeln!(out, "  vertex shader calls:        {:12}", self.vertex_shader_calls);
        let _ = writeln!(out, "  frustum culled:             {:12}", self.triangles_frustum_culled);
        let _ = writeln!(
            out,
            "  backface culled:            {:12}",
            self.triangles_backface_culled
        );
        let _ = writeln!(out, "  near clipped:               {:12}", self.triangles_near_clipped);

        let _ = writeln!(out, "Rasterization:");
        let _ = writeln!(out, "  pixels tested:              {:12}", self.pixels_tested);
        let _ = writeln!(out, "  fragments inserted:         {:12}", self.fragments_inserted);
        let _ = writeln!(out, "  fragments occluded:         {:12}", self.fragments_occluded);
        let attempts = self.fragments_inserted + self.fragments_occluded;
        if attempts > 0 {
            let pass_rate = self.fragments_inserted as f64 / attempts as f64 * 100.0;
            let _ = writeln!(out, "  depth test pass rate:       {:11.2}%", pass_rate);
        }

        let _ = writeln!(out, "Compositing:");
        let _ = write!(out, "  fragments shaded:           {:12}", self.fragments_shaded);
        out
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

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
