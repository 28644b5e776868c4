use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

pub const DEFAULT_CHUNK_COUNT: usize = 100;

/// 1 GiB
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 1 << 30;

/// How record boundaries between chunks are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Even split by record count. The trailing short window is kept as its
    /// own chunk unless `absorb_remainder` folds it into the previous one.
    Count {
        chunks: usize,
        absorb_remainder: bool,
    },
    /// Greedy accumulation up to `max_bytes` of serialized records.
    Size { max_bytes: u64 },
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Count {
            chunks: DEFAULT_CHUNK_COUNT,
            absorb_remainder: false,
        }
    }
}

/// Everything one split run needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub policy: Policy,
    pub workers: usize,
}

impl SplitConfig {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        SplitConfig {
            input: input.into(),
            output_dir: output_dir.into(),
            policy: Policy::default(),
            workers: default_workers(),
        }
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Zero is bumped to a single worker.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
