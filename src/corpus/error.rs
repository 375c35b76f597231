use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by rule corpus operations.
pub enum CorpusError {
    /// Could not reach the backing index.
    #[error("corpus store unreachable at '{url}': {message}")]
    Unreachable {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Similarity search failed.
    #[error("corpus search failed in '{collection}': {message}")]
    SearchFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Writing chunks to the index failed.
    #[error("failed to upsert chunks to '{collection}': {message}")]
    UpsertFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Query or chunk vector has the wrong width.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A stored chunk payload could not be decoded.
    #[error("corrupt chunk payload for point {point_id}: {message}")]
    CorruptPayload {
        /// Index point id.
        point_id: u64,
        /// Error message.
        message: String,
    },

    /// Corpus snapshot file could not be read.
    #[error("failed to read corpus snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus snapshot file is not valid JSON for a snapshot.
    #[error("failed to parse corpus snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A chunk references a rule the corpus does not hold.
    #[error("chunk '{chunk_id}' references unknown rule '{rule_id}'")]
    UnknownRule { chunk_id: String, rule_id: String },
}
