//! Storage layer: file-backed label and model-artifact stores.
//!
//! All persisted state lives in JSON files under a single data directory.
//! Writes go through a temp-and-rename so a crashed run never leaves a
//! half-written file visible to a subsequent load. The stores assume
//! single-process access; concurrent runs against the same data directory
//! are a caller responsibility.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub mod artifacts;
pub mod labels;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persisted state missing or inconsistent: {0}")]
    CorruptOrMissingState(String),
    #[error("label entries must be non-empty")]
    EmptyEntry,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Writes `bytes` to `path` via a sibling temp file and rename, creating
/// parent directories as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
