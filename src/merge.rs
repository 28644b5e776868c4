//! Reassembly of a chunk directory into one export.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::info;
use regex::Regex;

use crate::document::{load_document, Document};
use crate::error::MergeError;

fn chunk_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^chunk_(0|[1-9]\d*)\.json$").expect("chunk file pattern"))
}

/// `chunk_<n>.json` files in `dir`, ordered by `n`.
///
/// Fails unless the indices run 0, 1, 2, ... without a gap.
pub fn chunk_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let read_dir_err = |source: std::io::Error| MergeError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut found: Vec<(usize, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        let name = entry.file_name();
        let Some(caps) = name.to_str().and_then(|n| chunk_name().captures(n)) else {
            continue;
        };
        // indices too large for usize cannot be real chunk files
        if let Ok(index) = caps[1].parse::<usize>() {
            found.push((index, entry.path()));
        }
    }

    if found.is_empty() {
        return Err(MergeError::NoChunks(dir.to_path_buf()));
    }
    found.sort_by_key(|(index, _)| *index);

    for (expected, (index, _)) in found.iter().enumerate() {
        if *index != expected {
            return Err(MergeError::MissingChunk(expected));
        }
    }
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Concatenates `parts` in order. Every part must share the first one's
/// `type` and `version`; the result's `count` is the total record count.
pub fn merge_documents(parts: Vec<Document>) -> Result<Document, MergeError> {
    let mut parts = parts.into_iter().enumerate();
    let (_, first) = parts.next().ok_or(MergeError::Empty)?;
    let Document { mut data, meta } = first;

    for (index, part) in parts {
        if part.meta.kind != meta.kind || part.meta.version != meta.version {
            return Err(MergeError::MetaMismatch {
                index,
                expected: format!("type={} version={}", meta.kind, meta.version),
                found: format!("type={} version={}", part.meta.kind, part.meta.version),
            });
        }
        data.extend(part.data);
    }
    Ok(Document::new(meta, data))
}

/// Loads and merges every chunk file in `dir`.
pub fn merge_dir(dir: &Path) -> Result<Document, MergeError> {
    let paths = chunk_files(dir)?;
    info!("Merging {} chunk files from {}", paths.len(), dir.display());

    let parts = paths
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>, _>>()?;
    merge_documents(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Meta;
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    fn part(kind: &str, data: Vec<Value>) -> Document {
        let meta = Meta {
            kind: kind.into(),
            version: json!(5),
            count: 0,
            extra: Map::new(),
        };
        Document::new(meta, data)
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "{}").unwrap();
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let dir = TempDir::new().unwrap();
        for i in 0..12 {
            touch(dir.path(), &format!("chunk_{i}.json"));
        }
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "chunk_03.json");

        let files = chunk_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names[2], "chunk_2.json");
        assert_eq!(names[10], "chunk_10.json");
    }

    #[test]
    fn gap_in_indices_is_reported() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "chunk_0.json");
        touch(dir.path(), "chunk_2.json");

        let err = chunk_files(dir.path()).unwrap_err();
        assert!(matches!(err, MergeError::MissingChunk(1)));
    }

    #[test]
    fn empty_dir_has_no_chunks() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            chunk_files(dir.path()).unwrap_err(),
            MergeError::NoChunks(_)
        ));
    }

    #[test]
    fn merge_concatenates_and_recounts() {
        let merged = merge_documents(vec![
            part("users", vec![json!(1), json!(2)]),
            part("users", vec![json!(3)]),
        ])
        .unwrap();

        assert_eq!(merged.data, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(merged.meta.count, 3);
        assert_eq!(merged.meta.kind, "users");
    }

    #[test]
    fn merge_rejects_mixed_types() {
        let err = merge_documents(vec![
            part("users", vec![json!(1)]),
            part("groups", vec![json!(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, MergeError::MetaMismatch { index: 1, .. }));
    }

    #[test]
    fn merge_of_nothing_fails() {
        assert!(matches!(merge_documents(Vec::new()), Err(MergeError::Empty)));
    }
}
