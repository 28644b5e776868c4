use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a split run before any chunk is written.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutputDir { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("load task ended before finishing: {0}")]
    Task(String),

    #[error("failed to measure record {index}: {source}")]
    Measure {
        index: usize,
        source: serde_json::Error,
    },
}

/// Failure of a single chunk file. Siblings keep going.
#[derive(Debug, Error)]
pub enum ChunkWriteError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("chunk range {start}..{end} is outside the {len} loaded records")]
    Range { start: usize, end: usize, len: usize },

    #[error("writer task ended before reporting: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to list {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("no chunk_<n>.json files in {}", .0.display())]
    NoChunks(PathBuf),

    #[error("nothing to merge")]
    Empty,

    #[error("chunk_{0}.json is missing, chunk indices must be contiguous from 0")]
    MissingChunk(usize),

    #[error(transparent)]
    Load(#[from] SplitError),

    #[error("chunk_{index}.json has meta {found}, expected {expected}")]
    MetaMismatch {
        index: usize,
        expected: String,
        found: String,
    },
}
