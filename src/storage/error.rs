use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
/// Errors returned by evaluation stores.
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded.
    #[error("failed to serialize evaluation {id}: {source}")]
    Serialize {
        id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    /// A stored file is not a valid evaluation record.
    #[error("corrupt evaluation record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("evaluation {id} not found")]
    NotFound { id: Uuid },

    /// Records are created once; an id may not be inserted twice.
    #[error("evaluation {id} already exists")]
    DuplicateId { id: Uuid },
}

pub type StorageResult<T> = Result<T, StorageError>;
