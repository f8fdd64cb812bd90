//! Deterministic offline embedding: hashed bag-of-words.
//!
//! Each whitespace token is lower-cased, hashed with blake3 and counted
//! into a fixed-dimension bucket vector, which is then L2-normalised.
//! Texts sharing tokens land close under cosine distance, disjoint texts
//! are orthogonal, and the empty string maps to the zero vector. Output
//! depends only on the input text and the configured dimension, so saved
//! model artifacts stay comparable across runs.

use crate::{EmbedResponse, EmbeddingProvider, ProviderError};

pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct HashedProvider {
    dimension: usize,
}

impl Default for HashedProvider {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl HashedProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let digest = blake3::hash(token.as_bytes());
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&digest.as_bytes()[..8]);
            let bucket = (u64::from_le_bytes(buf) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_one(t)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        1.0 - dot
    }

    #[test]
    fn deterministic_and_normalised() {
        let provider = HashedProvider::default();
        let a = provider.embed_one("bank statement april");
        let b = provider.embed_one("bank statement april");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashedProvider::default();
        let v = provider.embed_one("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_tokens_are_closer_than_disjoint_ones() {
        let provider = HashedProvider::default();
        let seed = provider.embed_one("bank statement");
        let near = provider.embed_one("recent bank statement");
        let far = provider.embed_one("passport scan");
        assert!(cosine_distance(&seed, &near) < cosine_distance(&seed, &far));
    }

    #[tokio::test]
    async fn batch_preserves_row_order() {
        let provider = HashedProvider::default();
        let texts = vec!["first".to_string(), "second".to_string()];
        let resp = provider.embed(&texts).await.unwrap();
        assert_eq!(resp.vectors.len(), 2);
        assert_eq!(resp.vectors[0], provider.embed_one("first"));
        assert_eq!(resp.vectors[1], provider.embed_one("second"));
    }
}
