//! Query embeddings for rule retrieval.
//!
//! - [`Embedder`] is the seam the retriever depends on.
//! - [`HashedEmbedder`] is a deterministic feature-hashing embedder. Corpora must be
//!   embedded with the same embedder (and dimension) as the queries run against them.

mod error;
pub mod hashed;


pub use error::EmbeddingError;
pub use hashed::HashedEmbedder;

use std::future::Future;

/// Default embedding width.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Produces one embedding per input text.
pub trait Embedder: Send + Sync {
    /// Width of every vector this embedder returns.
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

/// Checks a vector against an expected width.
pub fn validate_embedding_dim(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
