//! The export envelope: a `meta` header and the `data` record array.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SplitError;

/// Header of a collector export.
///
/// `version` is kept as a raw JSON value because collectors disagree on
/// whether it is a number or a string. Keys other than `type`, `version` and
/// `count` (e.g. `methods`) survive untouched in `extra` and are written into
/// every chunk alongside the rewritten `count`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Meta {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: Value,
    #[serde(default)]
    pub count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meta {
    /// Copy of this header describing `count` records.
    pub fn with_count(&self, count: usize) -> Meta {
        Meta {
            count: count as u64,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Document {
    pub data: Vec<Value>,
    pub meta: Meta,
}

impl Document {
    pub fn new(meta: Meta, data: Vec<Value>) -> Self {
        let meta = meta.with_count(data.len());
        Document { data, meta }
    }
}

/// Reads and parses a whole export into memory.
pub fn load_document(path: &Path) -> Result<Document, SplitError> {
    let raw = fs::read(path).map_err(|source| SplitError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Document = serde_json::from_slice(&raw).map_err(|source| SplitError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Loaded {} records of type '{}' from {}",
        doc.data.len(),
        doc.meta.kind,
        path.display()
    );
    if doc.meta.count != doc.data.len() as u64 {
        warn!(
            "{}: meta.count is {} but data holds {} records",
            path.display(),
            doc.meta.count,
            doc.data.len()
        );
    }
    Ok(doc)
}
