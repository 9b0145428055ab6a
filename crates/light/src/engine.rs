use crate::propagate::{BlockPassStats, block_pass};
use crate::sky::sky_pass;
use levelhost_kernel::Level;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Errors from running the light engine on a level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LightError {
    #[error("level {0} is not initialized")]
    NotInitialized(String),
    #[error("level {0} is closed")]
    Closed(String),
}

/// Result of lighting one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightStats {
    pub columns: usize,
    pub block: BlockPassStats,
    pub sky_elapsed: Duration,
    pub block_elapsed: Duration,
    pub elapsed: Duration,
}

/// Running totals for one light phase across every level an engine lit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub runs: u32,
    pub total: Duration,
    pub slowest: Duration,
}

impl PhaseTimings {
    fn record(&mut self, elapsed: Duration) {
        self.runs += 1;
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
    }

    pub fn average(&self) -> Duration {
        if self.runs == 0 {
            return Duration::ZERO;
        }
        self.total / self.runs
    }
}

#[derive(Debug, Default)]
struct Timings {
    sky: PhaseTimings,
    block: PhaseTimings,
    run: PhaseTimings,
    /// Level with the slowest whole run so far.
    slowest_level: Option<String>,
}

/// Computes sky and block light for freshly generated levels.
///
/// One engine is shared by every level a registry builds; it counts its runs
/// so callers can tell whether lighting happened at all.
#[derive(Debug, Default)]
pub struct LightEngine {
    invocations: AtomicU64,
    timings: Mutex<Timings>,
}

impl LightEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run both passes on `level` as one unit. The level's provider is locked
    /// for the whole run.
    pub fn calculate(&self, level: &Level) -> Result<LightStats, LightError> {
        if level.is_closed() {
            return Err(LightError::Closed(level.name().to_string()));
        }
        if !level.is_initialized() {
            return Err(LightError::NotInitialized(level.name().to_string()));
        }
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let _span = tracing::info_span!("light_calculate", level = %level.name()).entered();
        let start = Instant::now();

        let mut world = level.lock_world();
        let columns = sky_pass(&mut world);
        let sky_elapsed = start.elapsed();
        let block = block_pass(&mut world);
        drop(world);

        let elapsed = start.elapsed();
        let stats = LightStats {
            columns,
            block,
            sky_elapsed,
            block_elapsed: elapsed.saturating_sub(sky_elapsed),
            elapsed,
        };
        self.record(level.name(), &stats);
        tracing::info!(
            columns,
            sources = block.sources_seeded,
            updated = block.voxels_updated,
            sky_ms = stats.sky_elapsed.as_secs_f64() * 1000.0,
            block_ms = stats.block_elapsed.as_secs_f64() * 1000.0,
            "lighting complete"
        );
        Ok(stats)
    }

    fn record(&self, level: &str, stats: &LightStats) {
        let mut timings = self.timings.lock();
        timings.sky.record(stats.sky_elapsed);
        timings.block.record(stats.block_elapsed);
        if stats.elapsed >= timings.run.slowest {
            timings.slowest_level = Some(level.to_string());
        }
        timings.run.record(stats.elapsed);
    }

    /// Number of `calculate` runs that started.
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn average_run(&self) -> Duration {
        self.timings.lock().run.average()
    }

    pub fn slowest_run(&self) -> Duration {
        self.timings.lock().run.slowest
    }

    /// Name of the level behind [`Self::slowest_run`].
    pub fn slowest_level(&self) -> Option<String> {
        self.timings.lock().slowest_level.clone()
    }

    pub fn sky_timings(&self) -> PhaseTimings {
        self.timings.lock().sky
    }

    pub fn block_timings(&self) -> PhaseTimings {
        self.timings.lock().block
    }
}
