//! Split oversized graph-collector exports (`{"data": [...], "meta": {...}}`)
//! into independently loadable `chunk_<n>.json` files.
//!
//! The pipeline is load, partition, write: [`load_document`] pulls the
//! whole export into memory, a [`Policy`] picks chunk boundaries, and
//! [`write_chunks`] fans the files out over a worker pool.

pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod merge;
pub mod partition;
pub mod writer;

use std::sync::Arc;

use indicatif::ProgressBar;
use log::info;

pub use config::{Policy, SplitConfig, DEFAULT_CHUNK_COUNT, DEFAULT_MAX_CHUNK_BYTES};
pub use document::{load_document, Document, Meta};
pub use error::{ChunkWriteError, MergeError, SplitError};
pub use merge::{chunk_files, merge_dir, merge_documents};
pub use partition::Chunk;
pub use writer::{chunk_path, write_chunks, ChunkOutcome, SplitReport};

/// Runs one split end to end.
///
/// Errors are returned only for the fatal stages (output dir, load,
/// measuring). Per-file write failures are inside the report.
pub async fn run_split(config: &SplitConfig, progress: &ProgressBar) -> Result<SplitReport, SplitError> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| SplitError::CreateOutputDir {
            path: config.output_dir.clone(),
            source,
        })?;

    let input = config.input.clone();
    let policy = config.policy;
    let (document, chunks) = tokio::task::spawn_blocking(move || {
        let document = load_document(&input)?;
        let chunks = policy.partition(&document.data)?;
        Ok::<_, SplitError>((document, chunks))
    })
    .await
    .map_err(|e| SplitError::Task(e.to_string()))??;
    info!(
        "Splitting {} records into {} chunks ({:?})",
        document.data.len(),
        chunks.len(),
        config.policy
    );

    progress.set_length(chunks.len() as u64);
    let report = write_chunks(
        Arc::new(document),
        chunks,
        &config.output_dir,
        config.workers,
        progress,
    )
    .await;
    progress.finish();

    info!(
        "Wrote {} of {} chunks ({} records, {} bytes) to {}",
        report.written().count(),
        report.outcomes.len(),
        report.records_written(),
        report.bytes_written(),
        config.output_dir.display()
    );
    Ok(report)
}
