//! Labeled training examples: accumulated corrections plus a seed set.
//!
//! Two JSON files share the shape `{"examples": [...], "labels": [...]}`
//! (parallel arrays). `labels.json` accumulates human corrections and is
//! append-only; `training_labels.json` is the author-supplied seed used
//! only while the accumulated set is empty.

use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LABELS_FILE: &str = "labels.json";
pub const TRAINING_LABELS_FILE: &str = "training_labels.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSet {
    pub examples: Vec<String>,
    pub labels: Vec<String>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty() || self.labels.is_empty()
    }

    /// Sorted distinct labels, for display during review.
    pub fn categories(&self) -> Vec<String> {
        self.labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn validate(&self, origin: &Path) -> Result<(), StoreError> {
        if self.examples.len() != self.labels.len() {
            return Err(StoreError::CorruptOrMissingState(format!(
                "{}: {} examples but {} labels",
                origin.display(),
                self.examples.len(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}

/// Picks the first non-empty set from an ordered list of sources. The
/// fallback order is strict: sources are never merged.
pub fn first_non_empty(sources: Vec<TrainingSet>) -> TrainingSet {
    sources
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

pub struct LabelStore {
    accumulated: PathBuf,
    seed: PathBuf,
}

impl LabelStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            accumulated: data_dir.join(LABELS_FILE),
            seed: data_dir.join(TRAINING_LABELS_FILE),
        }
    }

    pub fn with_paths(accumulated: PathBuf, seed: PathBuf) -> Self {
        Self { accumulated, seed }
    }

    /// Accumulated labels if present and non-empty, else the seed set,
    /// else an empty set (callers must refuse to train on that).
    pub fn load_or_initialize(&self) -> Result<TrainingSet, StoreError> {
        let accumulated = read_set(&self.accumulated)?;
        let seed = read_set(&self.seed)?;
        Ok(first_non_empty(vec![accumulated, seed]))
    }

    /// Appends one correction to the accumulated set, creating the file if
    /// absent. The write is durable before this returns.
    pub fn append(&self, example: &str, label: &str) -> Result<(), StoreError> {
        append_to(&self.accumulated, example, label)
    }

    /// Appends one author-supplied example to the seed set.
    pub fn append_seed(&self, example: &str, label: &str) -> Result<(), StoreError> {
        append_to(&self.seed, example, label)
    }
}

fn append_to(path: &Path, example: &str, label: &str) -> Result<(), StoreError> {
    let example = example.trim();
    let label = label.trim();
    if example.is_empty() || label.is_empty() {
        return Err(StoreError::EmptyEntry);
    }
    let mut set = read_set(path)?;
    set.examples.push(example.to_string());
    set.labels.push(label.to_string());
    write_atomic(path, &serde_json::to_vec_pretty(&set)?)?;
    Ok(())
}

fn read_set(path: &Path) -> Result<TrainingSet, StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "label file not found, treating as empty");
        return Ok(TrainingSet::default());
    }
    let content = fs::read_to_string(path)?;
    let set: TrainingSet = serde_json::from_str(&content)?;
    set.validate(path)?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_set(path: &Path, examples: &[&str], labels: &[&str]) {
        let set = TrainingSet {
            examples: examples.iter().map(|s| s.to_string()).collect(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        };
        fs::write(path, serde_json::to_string(&set).unwrap()).unwrap();
    }

    #[test]
    fn falls_back_to_seed_when_accumulated_missing() {
        let dir = tempdir().unwrap();
        let store = LabelStore::new(dir.path());
        write_set(
            &dir.path().join(TRAINING_LABELS_FILE),
            &["bank statement"],
            &["Finance"],
        );

        let set = store.load_or_initialize().unwrap();
        assert_eq!(set.examples, vec!["bank statement"]);
        assert_eq!(set.labels, vec!["Finance"]);
    }

    #[test]
    fn accumulated_takes_precedence_without_merging() {
        let dir = tempdir().unwrap();
        let store = LabelStore::new(dir.path());
        write_set(&dir.path().join(LABELS_FILE), &["invoice 42"], &["Finance"]);
        write_set(
            &dir.path().join(TRAINING_LABELS_FILE),
            &["passport scan"],
            &["ID"],
        );

        let set = store.load_or_initialize().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.examples, vec!["invoice 42"]);
    }

    #[test]
    fn empty_when_no_source_exists() {
        let dir = tempdir().unwrap();
        let store = LabelStore::new(dir.path());
        assert!(store.load_or_initialize().unwrap().is_empty());
    }

    #[test]
    fn append_creates_file_and_is_visible_to_load() {
        let dir = tempdir().unwrap();
        let store = LabelStore::new(dir.path());
        store.append("tenancy agreement", "Legal").unwrap();
        store.append("lease renewal", "Legal").unwrap();

        let set = store.load_or_initialize().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.examples[1], "lease renewal");
        assert_eq!(set.categories(), vec!["Legal"]);
    }

    #[test]
    fn append_rejects_empty_entries() {
        let dir = tempdir().unwrap();
        let store = LabelStore::new(dir.path());
        assert!(matches!(
            store.append("", "Finance"),
            Err(StoreError::EmptyEntry)
        ));
        assert!(matches!(
            store.append("bank statement", "  "),
            Err(StoreError::EmptyEntry)
        ));
        assert!(!dir.path().join(LABELS_FILE).exists());
    }

    #[test]
    fn mismatched_parallel_arrays_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LABELS_FILE);
        fs::write(&path, r#"{"examples": ["a", "b"], "labels": ["x"]}"#).unwrap();
        let store = LabelStore::new(dir.path());
        assert!(matches!(
            store.load_or_initialize(),
            Err(StoreError::CorruptOrMissingState(_))
        ));
    }

    #[test]
    fn first_non_empty_is_ordered() {
        let empty = TrainingSet::default();
        let seed = TrainingSet {
            examples: vec!["a".into()],
            labels: vec!["X".into()],
        };
        let picked = first_non_empty(vec![empty, seed.clone()]);
        assert_eq!(picked.examples, seed.examples);
        assert!(first_non_empty(vec![]).is_empty());
    }
}
