//! File-per-record store.
//!
//! Layout: `{root}/{session}/{evaluation_id}.json`. Writes go to a `.json.tmp` sibling
//! first and are renamed into place, so readers never see a half-written record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use super::{EvaluationQuery, EvaluationStore, sort_records};
use crate::domain::{QaStatus, TicketEvaluation};

const JSON_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

#[derive(Debug)]
pub struct FileEvaluationStore {
    root: PathBuf,
    // serializes read-modify-write sequences
    write_lock: Mutex<()>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Directory-safe form of a session id.
fn session_dir_name(session_id: &str) -> String {
    let name: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

impl FileEvaluationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, session_id: &str, id: Uuid) -> PathBuf {
        self.root
            .join(session_dir_name(session_id))
            .join(format!("{id}.{JSON_EXTENSION}"))
    }

    async fn write_record(&self, record: &TicketEvaluation) -> StorageResult<PathBuf> {
        let dir = self.root.join(session_dir_name(&record.session_id));
        fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| StorageError::Serialize {
            id: record.id,
            source,
        })?;

        let temp_path = dir.join(format!("{}.{TEMP_EXTENSION}", record.id));
        let final_path = self.record_path(&record.session_id, record.id);
        fs::write(&temp_path, &bytes)
            .await
            .map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(io_error(&final_path))?;
        Ok(final_path)
    }

    async fn read_record(path: &Path) -> StorageResult<TicketEvaluation> {
        let bytes = fs::read(path).await.map_err(io_error(path))?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Every record file under the root, across all sessions.
    async fn record_paths(&self) -> StorageResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut sessions = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(paths),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        while let Some(session) = sessions
            .next_entry()
            .await
            .map_err(io_error(&self.root))?
        {
            let session_path = session.path();
            if !session_path.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(&session_path)
                .await
                .map_err(io_error(&session_path))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(io_error(&session_path))?
            {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == JSON_EXTENSION) {
                    paths.push(path);
                }
            }
        }
        Ok(paths)
    }

    async fn load_all(&self) -> StorageResult<Vec<(PathBuf, TicketEvaluation)>> {
        let mut records = Vec::new();
        for path in self.record_paths().await? {
            match Self::read_record(&path).await {
                Ok(record) => records.push((path, record)),
                Err(StorageError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    async fn find_path(&self, id: Uuid) -> StorageResult<Option<PathBuf>> {
        let file_name = format!("{id}.{JSON_EXTENSION}");
        Ok(self
            .record_paths()
            .await?
            .into_iter()
            .find(|p| p.file_name().is_some_and(|n| n == file_name.as_str())))
    }
}

#[async_trait]
impl EvaluationStore for FileEvaluationStore {
    async fn insert(&self, record: &TicketEvaluation) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.find_path(record.id).await?.is_some() {
            return Err(StorageError::DuplicateId { id: record.id });
        }
        let path = self.write_record(record).await?;
        debug!(path = %path.display(), ticket_id = %record.ticket_id, "Evaluation stored");
        Ok(())
    }

    async fn delete_for_ticket(&self, ticket_id: &str) -> StorageResult<usize> {
        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        for (path, record) in self.load_all().await? {
            if record.ticket_id != ticket_id {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "Evaluation file vanished during delete");
                }
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }
        Ok(removed)
    }

    async fn get(&self, id: Uuid) -> StorageResult<Option<TicketEvaluation>> {
        match self.find_path(id).await? {
            Some(path) => Ok(Some(Self::read_record(&path).await?)),
            None => Ok(None),
        }
    }

    async fn query(&self, query: &EvaluationQuery) -> StorageResult<Vec<TicketEvaluation>> {
        let mut matched: Vec<TicketEvaluation> = self
            .load_all()
            .await?
            .into_iter()
            .map(|(_, record)| record)
            .filter(|r| query.matches(r))
            .collect();
        sort_records(&mut matched);
        Ok(matched)
    }

    async fn update_qa_status(&self, id: Uuid, status: QaStatus) -> StorageResult<TicketEvaluation> {
        let _guard = self.write_lock.lock().await;
        let path = self
            .find_path(id)
            .await?
            .ok_or(StorageError::NotFound { id })?;
        let mut record = Self::read_record(&path).await?;
        record.qa_status = status;
        self.write_record(&record).await?;
        Ok(record)
    }
}
