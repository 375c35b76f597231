use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use super::{EvaluationQuery, EvaluationStore, sort_records};
use crate::domain::{QaStatus, TicketEvaluation};

/// Process-local store, used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryEvaluationStore {
    records: RwLock<HashMap<Uuid, TicketEvaluation>>,
}

impl MemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl EvaluationStore for MemoryEvaluationStore {
    async fn insert(&self, record: &TicketEvaluation) -> StorageResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StorageError::DuplicateId { id: record.id });
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_for_ticket(&self, ticket_id: &str) -> StorageResult<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.ticket_id != ticket_id);
        Ok(before - records.len())
    }

    async fn get(&self, id: Uuid) -> StorageResult<Option<TicketEvaluation>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn query(&self, query: &EvaluationQuery) -> StorageResult<Vec<TicketEvaluation>> {
        let mut matched: Vec<TicketEvaluation> = self
            .records
            .read()
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_records(&mut matched);
        Ok(matched)
    }

    async fn update_qa_status(&self, id: Uuid, status: QaStatus) -> StorageResult<TicketEvaluation> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StorageError::NotFound { id })?;
        record.qa_status = status;
        Ok(record.clone())
    }
}
