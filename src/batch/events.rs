use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{OverallStatus, TicketEvaluation};

/// Where a batch run is when an event is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BatchPhase {
    Started { total: usize, window_size: usize },
    /// `window` is one-based.
    WindowCompleted { window: usize, windows: usize },
    Completed { duration_ms: u64 },
}

/// Running totals over the tickets processed so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchCounters {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pass: usize,
    pub fail: usize,
    pub needs_review: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub percent: f64,
}

impl BatchCounters {
    pub fn new(total: usize) -> Self {
        let mut counters = Self {
            total,
            ..Default::default()
        };
        counters.refresh_percent();
        counters
    }

    pub fn record(&mut self, evaluation: &TicketEvaluation) {
        self.completed += 1;
        match evaluation.overall_status {
            OverallStatus::Pass => self.pass += 1,
            OverallStatus::Fail => self.fail += 1,
            OverallStatus::NeedsReview => self.needs_review += 1,
        }
        self.prompt_tokens += evaluation.usage.prompt_tokens;
        self.completion_tokens += evaluation.usage.completion_tokens;
        self.cost_usd += evaluation.cost_usd;
        self.refresh_percent();
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
        self.refresh_percent();
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    fn refresh_percent(&mut self) {
        self.percent = if self.total == 0 {
            100.0
        } else {
            self.processed() as f64 * 100.0 / self.total as f64
        };
    }
}

/// One progress update, keyed by session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub session_id: String,
    #[serde(flatten)]
    pub phase: BatchPhase,
    pub counters: BatchCounters,
    pub emitted_at: DateTime<Utc>,
}

/// A ticket whose evaluation did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub ticket_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub session_id: String,
    pub counters: BatchCounters,
    pub errors: Vec<BatchItemError>,
    /// Ids of the stored evaluations, in input order.
    pub evaluation_ids: Vec<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}
