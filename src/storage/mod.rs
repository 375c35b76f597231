//! Persisted evaluation records.
//!
//! A [`TicketEvaluation`] is written once per attempt. Its verdict is never edited in
//! place: re-evaluation deletes the ticket's records and inserts a new one. Only the QA
//! workflow status may change after creation.

pub mod aggregate;
mod error;
pub mod file;
pub mod memory;


pub use aggregate::SessionAggregate;
pub use error::{StorageError, StorageResult};
pub use file::FileEvaluationStore;
pub use memory::MemoryEvaluationStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{OverallStatus, QaStatus, TicketEvaluation};

/// Filter for [`EvaluationStore::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationQuery {
    pub session_id: Option<String>,
    pub ticket_id: Option<String>,
    pub agent_id: Option<String>,
    pub category: Option<String>,
    pub overall_status: Option<OverallStatus>,
    pub qa_status: Option<QaStatus>,
}

impl EvaluationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn ticket(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn status(mut self, status: OverallStatus) -> Self {
        self.overall_status = Some(status);
        self
    }

    pub fn qa_status(mut self, status: QaStatus) -> Self {
        self.qa_status = Some(status);
        self
    }

    pub fn matches(&self, record: &TicketEvaluation) -> bool {
        self.session_id.as_ref().is_none_or(|s| s == &record.session_id)
            && self.ticket_id.as_ref().is_none_or(|t| t == &record.ticket_id)
            && self
                .agent_id
                .as_ref()
                .is_none_or(|a| record.agent_id.as_ref() == Some(a))
            && self
                .category
                .as_ref()
                .is_none_or(|c| c.eq_ignore_ascii_case(&record.classification.category))
            && self.overall_status.is_none_or(|s| s == record.overall_status)
            && self.qa_status.is_none_or(|s| s == record.qa_status)
    }
}

/// Sorts query results oldest first, id as tiebreak.
pub(crate) fn sort_records(records: &mut [TicketEvaluation]) {
    records.sort_by(|a, b| {
        a.timing
            .started_at
            .cmp(&b.timing.started_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Stores a new record. Fails if the id is already present.
    async fn insert(&self, record: &TicketEvaluation) -> StorageResult<()>;

    /// Removes every record for `ticket_id`; returns how many were removed.
    async fn delete_for_ticket(&self, ticket_id: &str) -> StorageResult<usize>;

    async fn get(&self, id: Uuid) -> StorageResult<Option<TicketEvaluation>>;

    /// Matching records, oldest first.
    async fn query(&self, query: &EvaluationQuery) -> StorageResult<Vec<TicketEvaluation>>;

    /// Moves a record through the QA workflow and returns the updated record.
    async fn update_qa_status(&self, id: Uuid, status: QaStatus) -> StorageResult<TicketEvaluation>;
}
