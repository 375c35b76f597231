use thiserror::Error;

use crate::corpus::CorpusError;
use crate::embedding::EmbeddingError;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to embed retrieval query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("rule corpus lookup failed: {0}")]
    Corpus(#[from] CorpusError),
}
