//! Model artifacts: the fitted parameters, the embedding matrix and the
//! training snapshot, persisted as three JSON files that load and save as
//! one unit. A load that finds any of the three missing or mutually
//! inconsistent fails rather than returning partial state.

use crate::{write_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "model.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParams {
    pub neighbors: usize,
    pub metric: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub examples: Vec<String>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub params: ModelParams,
    pub embeddings: Vec<Vec<f32>>,
    pub metadata: ModelMetadata,
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when a previously saved model is present (all three files).
    pub fn exists(&self) -> bool {
        [MODEL_FILE, EMBEDDINGS_FILE, METADATA_FILE]
            .iter()
            .all(|f| self.dir.join(f).exists())
    }

    /// Persists the fitted state. Metadata is written last so an
    /// interrupted save is detected as inconsistent on the next load.
    pub fn save(
        &self,
        params: &ModelParams,
        embeddings: &[Vec<f32>],
        metadata: &ModelMetadata,
    ) -> Result<(), StoreError> {
        if embeddings.len() != metadata.examples.len()
            || metadata.examples.len() != metadata.labels.len()
        {
            return Err(StoreError::CorruptOrMissingState(format!(
                "refusing to save mismatched state: {} rows, {} examples, {} labels",
                embeddings.len(),
                metadata.examples.len(),
                metadata.labels.len()
            )));
        }
        write_atomic(
            &self.dir.join(MODEL_FILE),
            &serde_json::to_vec_pretty(params)?,
        )?;
        write_atomic(
            &self.dir.join(EMBEDDINGS_FILE),
            &serde_json::to_vec(&embeddings)?,
        )?;
        write_atomic(
            &self.dir.join(METADATA_FILE),
            &serde_json::to_vec_pretty(metadata)?,
        )?;
        Ok(())
    }

    pub fn load(&self) -> Result<LoadedModel, StoreError> {
        let params: ModelParams = self.read_json(MODEL_FILE)?;
        let embeddings: Vec<Vec<f32>> = self.read_json(EMBEDDINGS_FILE)?;
        let metadata: ModelMetadata = self.read_json(METADATA_FILE)?;

        if metadata.examples.len() != metadata.labels.len() {
            return Err(StoreError::CorruptOrMissingState(format!(
                "metadata mismatch: {} examples but {} labels",
                metadata.examples.len(),
                metadata.labels.len()
            )));
        }
        if embeddings.len() != metadata.examples.len() {
            return Err(StoreError::CorruptOrMissingState(format!(
                "embedding matrix has {} rows but metadata lists {} examples",
                embeddings.len(),
                metadata.examples.len()
            )));
        }
        if embeddings.is_empty() {
            return Err(StoreError::CorruptOrMissingState(
                "embedding matrix is empty".into(),
            ));
        }
        let dim = embeddings[0].len();
        if embeddings.iter().any(|row| row.len() != dim) {
            return Err(StoreError::CorruptOrMissingState(
                "embedding matrix rows have uneven dimensions".into(),
            ));
        }

        Ok(LoadedModel {
            params,
            embeddings,
            metadata,
        })
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Err(StoreError::CorruptOrMissingState(format!(
                "missing artifact {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(&path)?;
        // A half-written or garbage artifact is recoverable state, not a
        // serialization bug: report it as corrupt so callers can retrain.
        serde_json::from_str(&content).map_err(|e| {
            StoreError::CorruptOrMissingState(format!(
                "malformed artifact {}: {}",
                path.display(),
                e
            ))
        })
    }
}
