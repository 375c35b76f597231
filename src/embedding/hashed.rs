use tracing::debug;

use super::error::EmbeddingError;
use super::{DEFAULT_EMBEDDING_DIM, Embedder};
use crate::hashing::feature_bucket;

/// Signed feature hashing over lower-cased word unigrams and bigrams, L2-normalized.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dim: usize,
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Result<Self, EmbeddingError> {
        if dim == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding dimension must be non-zero".to_string(),
            });
        }
        Ok(Self { dim })
    }

    /// Synchronous embedding; the async [`Embedder::embed`] delegates here.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let mut vector = vec![0.0f32; self.dim];
        for token in &tokens {
            let (bucket, sign) = feature_bucket(token, self.dim);
            vector[bucket] += sign;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            let (bucket, sign) = feature_bucket(&bigram, self.dim);
            vector[bucket] += 0.5 * sign;
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

impl Embedder for HashedEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        debug!(text_len = text.len(), dim = self.dim, "Embedding query text");
        Ok(self.embed_text(text))
    }
}
