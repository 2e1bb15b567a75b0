//! Dispatcher configuration.
//!
//! One immutable [`DispatchConfig`] is built at startup and handed to every
//! component that needs it. Nothing reads configuration from globals.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::job::ParseOptions;
use crate::router::ResourceClass;

/// Upper bound on the default GPU pool size, to avoid oversubscribing devices.
pub const DEFAULT_GPU_CAP: usize = 8;

/// Default queue slots per worker in a lane.
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Option names (long and short) owned by the dispatcher's own command line.
///
/// The job parser uses this to tell a misplaced dispatcher option apart from
/// an option meant for the worker binary.
pub const DISPATCHER_OPTIONS: &[&str] = &[
    "script", "s", "random", "r", "quiet", "q", "exact", "e", "cpuLimit", "c", "gpuLimit", "g",
    "help", "h", "version", "V",
];

/// Number of processors available to this process (at least 1).
pub fn available_processors() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Sizing for one resource class's worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneConfig {
    /// Number of concurrent workers.
    pub limit: usize,
    /// Capacity of the lane's input queue.
    pub queue_depth: usize,
}

impl LaneConfig {
    /// A lane with `limit` workers and the default queue depth.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            queue_depth: limit * QUEUE_SLOTS_PER_WORKER,
        }
    }

    /// Override the queue capacity.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }
}

/// Everything the dispatcher needs to know, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker binary invoked for every unit.
    pub binary: PathBuf,
    /// Shuffle sources before batching.
    pub shuffle: bool,
    /// Only log failures.
    pub quiet: bool,
    /// Require exact catalog-name matches.
    pub exact: bool,
    /// CPU-bound lane.
    pub cpu: LaneConfig,
    /// GPU-bound lane.
    pub gpu: LaneConfig,
}

impl DispatchConfig {
    /// Defaults: shuffled, verbose, substring matching, one CPU worker per
    /// processor and at most [`DEFAULT_GPU_CAP`] GPU workers.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let processors = available_processors();
        Self {
            binary: binary.into(),
            shuffle: true,
            quiet: false,
            exact: false,
            cpu: LaneConfig::new(processors),
            gpu: LaneConfig::new(processors.min(DEFAULT_GPU_CAP)),
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn with_cpu_limit(mut self, limit: usize) -> Self {
        self.cpu = LaneConfig::new(limit);
        self
    }

    pub fn with_gpu_limit(mut self, limit: usize) -> Self {
        self.gpu = LaneConfig::new(limit);
        self
    }

    /// Sizing of the lane serving `class`.
    pub fn lane(&self, class: ResourceClass) -> LaneConfig {
        match class {
            ResourceClass::Cpu => self.cpu,
            ResourceClass::Gpu => self.gpu,
        }
    }

    /// Parser options derived from this configuration.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { exact: self.exact }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_processor_count() {
        let config = DispatchConfig::new("/bin/dm");
        let processors = available_processors();
        assert!(config.shuffle);
        assert!(!config.quiet);
        assert!(!config.exact);
        assert_eq!(config.cpu.limit, processors);
        assert_eq!(config.gpu.limit, processors.min(DEFAULT_GPU_CAP));
        assert!(config.gpu.limit <= DEFAULT_GPU_CAP);
    }

    #[test]
    fn limits_never_drop_to_zero() {
        let config = DispatchConfig::new("dm").with_cpu_limit(0).with_gpu_limit(0);
        assert_eq!(config.cpu.limit, 1);
        assert_eq!(config.gpu.limit, 1);
        assert_eq!(LaneConfig::new(3).with_queue_depth(0).queue_depth, 1);
    }

    #[test]
    fn lane_lookup() {
        let config = DispatchConfig::new("dm").with_cpu_limit(6).with_gpu_limit(2);
        assert_eq!(config.lane(ResourceClass::Cpu).limit, 6);
        assert_eq!(config.lane(ResourceClass::Gpu).limit, 2);
        assert_eq!(config.lane(ResourceClass::Gpu).queue_depth, 2 * QUEUE_SLOTS_PER_WORKER);
    }
}
