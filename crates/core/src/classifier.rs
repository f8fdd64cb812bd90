//! Nearest-neighbour classifier over text embeddings.
//!
//! Training embeds every labeled example into a matrix; prediction embeds
//! the query, ranks training rows by cosine distance and majority-votes
//! the k nearest labels. The reported confidence is the mean distance to
//! those k neighbours, not a probability, so lower is better. Thresholds
//! stay comparable across runs only while the embedding model and metric
//! are held fixed.

use providers::{EmbeddingProvider, ProviderError};
use std::cmp::Ordering;
use std::sync::Arc;
use storage::artifacts::{ArtifactStore, LoadedModel, ModelMetadata, ModelParams};
use storage::StoreError;
use thiserror::Error;
use tracing::info;

pub const COSINE_METRIC: &str = "cosine";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("training data is empty or mismatched ({examples} examples, {labels} labels)")]
    InvalidTrainingData { examples: usize, labels: usize },
    #[error("classifier has not been trained or loaded")]
    NotTrained,
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct NearestExample {
    pub example: String,
    pub label: String,
    pub distance: f32,
}

#[derive(Debug, Clone)]
struct Fitted {
    examples: Vec<String>,
    labels: Vec<String>,
    matrix: Vec<Vec<f32>>,
}

impl Fitted {
    /// All training rows as (index, distance), nearest first. Ties on
    /// distance break by row index, so ranking is deterministic.
    fn ranked_neighbours(&self, query: &[f32]) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .matrix
            .iter()
            .enumerate()
            .map(|(i, row)| (i, cosine_distance(query, row)))
            .collect();
        ranked.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked
    }
}

pub struct NeighborClassifier {
    provider: Arc<dyn EmbeddingProvider>,
    embedding_model: String,
    neighbors: usize,
    batch_size: usize,
    fitted: Option<Fitted>,
}

impl NeighborClassifier {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        embedding_model: String,
        neighbors: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            embedding_model,
            neighbors: neighbors.max(1),
            batch_size: batch_size.max(1),
            fitted: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    /// Embeds all examples and fits the index. The previous fitted state
    /// is replaced only once the new one is fully built; on any failure
    /// the classifier is left exactly as it was.
    pub async fn train(
        &mut self,
        examples: &[String],
        labels: &[String],
    ) -> Result<(), ClassifierError> {
        if examples.is_empty() || labels.is_empty() || examples.len() != labels.len() {
            return Err(ClassifierError::InvalidTrainingData {
                examples: examples.len(),
                labels: labels.len(),
            });
        }

        let mut matrix = Vec::with_capacity(examples.len());
        for batch in examples.chunks(self.batch_size) {
            let resp = self.provider.embed(batch).await?;
            if resp.vectors.len() != batch.len() {
                return Err(ClassifierError::Embedding(ProviderError::RequestFailed(
                    format!(
                        "provider returned {} rows for {} inputs",
                        resp.vectors.len(),
                        batch.len()
                    ),
                )));
            }
            matrix.extend(resp.vectors);
        }

        self.fitted = Some(Fitted {
            examples: examples.to_vec(),
            labels: labels.to_vec(),
            matrix,
        });
        info!(examples = examples.len(), "trained nearest-neighbour classifier");
        Ok(())
    }

    /// Returns the majority label among the k nearest training examples
    /// and the mean distance to them. Vote ties break by smallest
    /// cumulative distance, then by first-seen neighbour order.
    pub async fn predict_with_confidence(
        &self,
        text: &str,
    ) -> Result<(String, f32), ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotTrained)?;
        let query = self.embed_one(text).await?;
        let ranked = fitted.ranked_neighbours(&query);
        let k = self.neighbors.min(ranked.len());
        let neighbours = &ranked[..k];
        let confidence = neighbours.iter().map(|n| n.1).sum::<f32>() / k as f32;
        Ok((majority_label(fitted, neighbours), confidence))
    }

    /// The single closest training example, for the distances report.
    pub async fn nearest(&self, text: &str) -> Result<NearestExample, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotTrained)?;
        let query = self.embed_one(text).await?;
        let ranked = fitted.ranked_neighbours(&query);
        let (idx, distance) = ranked[0];
        Ok(NearestExample {
            example: fitted.examples[idx].clone(),
            label: fitted.labels[idx].clone(),
            distance,
        })
    }

    pub fn save(&self, store: &ArtifactStore) -> Result<(), ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotTrained)?;
        let params = ModelParams {
            neighbors: self.neighbors,
            metric: COSINE_METRIC.to_string(),
            embedding_model: self.embedding_model.clone(),
        };
        let metadata = ModelMetadata {
            examples: fitted.examples.clone(),
            labels: fitted.labels.clone(),
        };
        store.save(&params, &fitted.matrix, &metadata)?;
        Ok(())
    }

    /// Restores a saved fit. Artifacts built with a different embedding
    /// model or metric are rejected as corrupt, since their distances are
    /// not comparable to anything this classifier would compute.
    pub fn load(&mut self, store: &ArtifactStore) -> Result<(), ClassifierError> {
        let LoadedModel {
            params,
            embeddings,
            metadata,
        } = store.load()?;
        if params.embedding_model != self.embedding_model {
            return Err(ClassifierError::Store(StoreError::CorruptOrMissingState(
                format!(
                    "artifacts were built with embedding model '{}' but '{}' is configured",
                    params.embedding_model, self.embedding_model
                ),
            )));
        }
        if params.metric != COSINE_METRIC {
            return Err(ClassifierError::Store(StoreError::CorruptOrMissingState(
                format!("unsupported distance metric '{}'", params.metric),
            )));
        }
        self.neighbors = params.neighbors.max(1);
        self.fitted = Some(Fitted {
            examples: metadata.examples,
            labels: metadata.labels,
            matrix: embeddings,
        });
        Ok(())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let texts = [text.to_string()];
        let resp = self.provider.embed(&texts).await?;
        resp.vectors
            .into_iter()
            .next()
            .ok_or_else(|| {
                ClassifierError::Embedding(ProviderError::RequestFailed(
                    "provider returned no rows".into(),
                ))
            })
    }
}

fn majority_label(fitted: &Fitted, neighbours: &[(usize, f32)]) -> String {
    // (label, votes, cumulative distance, first-seen position)
    let mut tally: Vec<(&str, usize, f32, usize)> = Vec::new();
    for (pos, (idx, dist)) in neighbours.iter().enumerate() {
        let label = fitted.labels[*idx].as_str();
        match tally.iter_mut().find(|t| t.0 == label) {
            Some(t) => {
                t.1 += 1;
                t.2 += dist;
            }
            None => tally.push((label, 1, *dist, pos)),
        }
    }
    tally.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
            .then(a.3.cmp(&b.3))
    });
    tally[0].0.to_string()
}

/// Cosine distance in [0, 2]; zero vectors are maximally distant (1.0).
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}
