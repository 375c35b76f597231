use thiserror::Error;

use crate::storage::StorageError;

/// Failures that escape [`Evaluator::evaluate`](super::Evaluator::evaluate).
///
/// Model and retrieval failures never reach the caller: they degrade into a
/// `needs_review` record instead.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Model output was not a JSON assessment. Feeds the retry loop.
    #[error("could not extract an assessment from model output: {message}")]
    Extraction { message: String },

    /// The evaluation ran but its record could not be persisted.
    #[error("failed to persist evaluation: {0}")]
    Storage(#[from] StorageError),
}
