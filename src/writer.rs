//! Parallel emission of chunk files.
//!
//! A fixed pool of blocking workers pulls chunk indices from a shared cursor
//! and writes `chunk_<index>.json` files. Every worker owns the file it is
//! writing, so there is nothing to lock; the only synchronisation is the
//! final join.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{debug, error};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::document::{Document, Meta};
use crate::error::ChunkWriteError;
use crate::partition::Chunk;

// Borrowed view of one output file, `data` first like the source export.
#[derive(Serialize)]
struct ChunkDocument<'a> {
    data: &'a [Value],
    meta: Meta,
}

/// Result of writing one chunk file.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub path: PathBuf,
    pub records: usize,
    /// Bytes on disk when the write succeeded.
    pub result: Result<u64, ChunkWriteError>,
}

impl ChunkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// All chunk outcomes of one run, ordered by chunk index.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub outcomes: Vec<ChunkOutcome>,
}

impl SplitReport {
    pub fn written(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn records_written(&self) -> usize {
        self.written().map(|o| o.records).sum()
    }

    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

pub fn chunk_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir.join(format!("chunk_{index}.json"))
}

/// Writes one chunk with corrected metadata and returns its size on disk.
pub fn write_chunk(document: &Document, chunk: &Chunk, path: &Path) -> Result<u64, ChunkWriteError> {
    let data = document
        .data
        .get(chunk.range.clone())
        .ok_or(ChunkWriteError::Range {
            start: chunk.range.start,
            end: chunk.range.end,
            len: document.data.len(),
        })?;
    let payload = ChunkDocument {
        data,
        meta: document.meta.with_count(chunk.len()),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &payload)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

/// Writes every chunk using `workers` blocking tasks.
///
/// Never fails as a whole: each chunk's result lands in the report, and a
/// failed file does not stop the others.
pub async fn write_chunks(
    document: Arc<Document>,
    chunks: Vec<Chunk>,
    output_dir: &Path,
    workers: usize,
    progress: &ProgressBar,
) -> SplitReport {
    let total = chunks.len();
    let chunks = Arc::new(chunks);
    let cursor = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<ChunkOutcome>();

    let workers = workers.clamp(1, total.max(1));
    debug!("Writing {total} chunks with {workers} workers");

    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let document = Arc::clone(&document);
        let chunks = Arc::clone(&chunks);
        let cursor = Arc::clone(&cursor);
        let tx = tx.clone();
        let output_dir = output_dir.to_path_buf();
        let progress = progress.clone();

        pool.spawn_blocking(move || {
            let mut handled = 0usize;
            while let Some(chunk) = chunks.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                let path = chunk_path(&output_dir, chunk.index);
                let result = write_chunk(&document, chunk, &path);
                match &result {
                    Ok(bytes) => debug!("{} ({} records, {bytes} bytes)", path.display(), chunk.len()),
                    Err(e) => error!("Error writing file {}: {e}", path.display()),
                }
                progress.inc(1);
                handled += 1;

                let _ = tx.send(ChunkOutcome {
                    index: chunk.index,
                    path,
                    records: chunk.len(),
                    result,
                });
            }
            debug!("writer {worker} done after {handled} chunks");
        });
    }
    drop(tx);

    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            error!("writer task failed: {e}");
        }
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }

    // chunks picked up by a worker that died mid-write never reported back
    let reported: HashSet<usize> = outcomes.iter().map(|o| o.index).collect();
    for chunk in chunks.iter().filter(|c| !reported.contains(&c.index)) {
        let path = chunk_path(output_dir, chunk.index);
        error!("No result for {}, writer task ended early", path.display());
        outcomes.push(ChunkOutcome {
            index: chunk.index,
            path,
            records: chunk.len(),
            result: Err(ChunkWriteError::Worker("writer task ended early".into())),
        });
    }

    outcomes.sort_by_key(|o| o.index);
    SplitReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::document::load_document;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn sample(n: usize) -> Document {
        let meta = Meta {
            kind: "computers".into(),
            version: json!(5),
            count: n as u64,
            extra: Map::new(),
        };
        Document::new(meta, (0..n).map(|i| json!({ "id": i })).collect())
    }

    #[test]
    fn chunk_file_has_corrected_count() {
        let dir = TempDir::new().unwrap();
        let doc = sample(10);
        let chunk = Chunk { index: 3, range: 4..7 };
        let path = chunk_path(dir.path(), chunk.index);

        let bytes = write_chunk(&doc, &chunk, &path).unwrap();
        assert!(bytes > 0);
        assert!(path.ends_with("chunk_3.json"));

        let back = load_document(&path).unwrap();
        assert_eq!(back.meta.count, 3);
        assert_eq!(back.meta.kind, "computers");
        assert_eq!(back.meta.version, json!(5));
        assert_eq!(back.data, doc.data[4..7].to_vec());
    }

    #[test]
    fn data_key_comes_first() {
        let dir = TempDir::new().unwrap();
        let doc = sample(1);
        let path = chunk_path(dir.path(), 0);
        write_chunk(&doc, &Chunk { index: 0, range: 0..1 }, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(r#"{"data":[{"id":0}],"meta":{"type":"computers""#));
    }

    #[tokio::test]
    async fn parallel_writes_keep_partition_indices() {
        let dir = TempDir::new().unwrap();
        let doc = Arc::new(sample(37));
        let chunks = Policy::Count {
            chunks: 8,
            absorb_remainder: false,
        }
        .partition(&doc.data)
        .unwrap();
        let expected = chunks.len();

        let report = write_chunks(Arc::clone(&doc), chunks, dir.path(), 4, &ProgressBar::hidden()).await;

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), expected);
        assert_eq!(report.records_written(), 37);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.path, chunk_path(dir.path(), i));
        }

        let mut rebuilt = Vec::new();
        for i in 0..expected {
            let part = load_document(&chunk_path(dir.path(), i)).unwrap();
            assert_eq!(part.meta.count as usize, part.data.len());
            rebuilt.extend(part.data);
        }
        assert_eq!(rebuilt, doc.data);
    }

    #[tokio::test]
    async fn failed_file_does_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        // a directory squatting on chunk_1.json makes that one create() fail
        std::fs::create_dir(chunk_path(dir.path(), 1)).unwrap();

        let doc = Arc::new(sample(6));
        let chunks = Policy::Count {
            chunks: 3,
            absorb_remainder: false,
        }
        .partition(&doc.data)
        .unwrap();

        let report = write_chunks(doc, chunks, dir.path(), 2, &ProgressBar::hidden()).await;

        assert!(!report.is_success());
        let failed: Vec<usize> = report.failures().map(|o| o.index).collect();
        assert_eq!(failed, vec![1]);
        assert!(matches!(
            report.outcomes[1].result,
            Err(ChunkWriteError::Io(_))
        ));
        assert_eq!(report.written().count(), 2);
        assert_eq!(report.records_written(), 4);
        assert!(chunk_path(dir.path(), 0).is_file());
        assert!(chunk_path(dir.path(), 2).is_file());
    }

    #[tokio::test]
    async fn out_of_range_chunk_fails_alone() {
        let dir = TempDir::new().unwrap();
        let doc = Arc::new(sample(4));
        let chunks = vec![
            Chunk { index: 0, range: 0..9 },
            Chunk { index: 1, range: 0..2 },
            Chunk { index: 2, range: 2..4 },
        ];

        let report = write_chunks(doc, chunks, dir.path(), 1, &ProgressBar::hidden()).await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(matches!(
            report.outcomes[0].result,
            Err(ChunkWriteError::Range { start: 0, end: 9, len: 4 })
        ));
        assert!(report.outcomes[1].is_ok());
        assert!(report.outcomes[2].is_ok());
        assert!(!chunk_path(dir.path(), 0).exists());
        assert_eq!(load_document(&chunk_path(dir.path(), 1)).unwrap().data.len(), 2);
        assert_eq!(load_document(&chunk_path(dir.path(), 2)).unwrap().data.len(), 2);
    }

    #[tokio::test]
    async fn no_chunks_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let report = write_chunks(Arc::new(sample(0)), Vec::new(), dir.path(), 4, &ProgressBar::hidden()).await;
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
