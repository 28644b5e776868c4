//! Chunk boundary selection.
//!
//! Both policies produce contiguous, order-preserving ranges over the record
//! array that together cover every record exactly once. Chunk indices follow
//! range order and later become the `chunk_<index>.json` file names.

use std::io;
use std::ops::Range;

use log::debug;
use serde_json::Value;

use crate::config::Policy;
use crate::error::SplitError;

/// One output file's worth of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub range: Range<usize>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl Policy {
    pub fn partition(&self, records: &[Value]) -> Result<Vec<Chunk>, SplitError> {
        let ranges = match *self {
            Policy::Count {
                chunks,
                absorb_remainder,
            } => by_count(records.len(), chunks, absorb_remainder),
            Policy::Size { max_bytes } => by_size(records, max_bytes)?,
        };
        debug!("{:?} produced {} chunks", self, ranges.len());

        Ok(ranges
            .into_iter()
            .enumerate()
            .map(|(index, range)| Chunk { index, range })
            .collect())
    }
}

/// Fixed-width windows of `max(1, len / chunks)` records.
///
/// When `len` is not a multiple of the window the tail becomes extra, shorter
/// chunks, so the result can hold more than `chunks` ranges. With
/// `absorb_remainder` everything past the `chunks`-th window is merged into it
/// instead.
pub fn by_count(len: usize, chunks: usize, absorb_remainder: bool) -> Vec<Range<usize>> {
    let chunks = chunks.max(1);
    let width = (len / chunks).max(1);

    let mut ranges: Vec<Range<usize>> = (0..len)
        .step_by(width)
        .map(|start| start..(start + width).min(len))
        .collect();

    if absorb_remainder && ranges.len() > chunks {
        ranges.truncate(chunks);
        if let Some(last) = ranges.last_mut() {
            last.end = len;
        }
    }
    ranges
}

/// Greedy packing by compact serialized size.
///
/// A chunk is closed as soon as the next record would take it past
/// `max_bytes`. Records are never split, so a record larger than the limit
/// ends up alone in its own chunk.
pub fn by_size(records: &[Value], max_bytes: u64) -> Result<Vec<Range<usize>>, SplitError> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut acc: u64 = 0;

    for (index, record) in records.iter().enumerate() {
        let size = serialized_len(record).map_err(|source| SplitError::Measure { index, source })?;

        if index > start && acc.saturating_add(size) > max_bytes {
            ranges.push(start..index);
            start = index;
            acc = 0;
        }
        acc = acc.saturating_add(size);
    }
    if start < records.len() {
        ranges.push(start..records.len());
    }
    Ok(ranges)
}

/// Byte length of `value` as `serde_json::to_writer` would emit it.
pub fn serialized_len(value: &Value) -> Result<u64, serde_json::Error> {
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, value)?;
    Ok(counter.0)
}

struct ByteCounter(u64);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
