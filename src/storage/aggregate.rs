use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{OverallStatus, TicketEvaluation, TokenUsage};
use crate::llm::RateTable;

/// Session-level statistics derived from stored evaluations. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregate {
    pub evaluations: usize,
    pub pass: usize,
    pub fail: usize,
    pub needs_review: usize,
    pub usage: TokenUsage,
    /// Recomputed from each record's per-model usage with the rate table.
    pub cost_usd: f64,
    pub avg_duration_ms: f64,
    pub by_category: BTreeMap<String, usize>,
}

impl SessionAggregate {
    pub fn from_evaluations(records: &[TicketEvaluation], rates: &RateTable) -> Self {
        let mut aggregate = Self {
            evaluations: records.len(),
            ..Self::default()
        };
        let mut total_duration_ms = 0u64;

        for record in records {
            match record.overall_status {
                OverallStatus::Pass => aggregate.pass += 1,
                OverallStatus::Fail => aggregate.fail += 1,
                OverallStatus::NeedsReview => aggregate.needs_review += 1,
            }
            aggregate.usage.accumulate(&record.usage);
            aggregate.cost_usd += rates.cost_of(record);
            total_duration_ms += record.timing.duration_ms;
            *aggregate
                .by_category
                .entry(record.classification.category.clone())
                .or_default() += 1;
        }

        if !records.is_empty() {
            aggregate.avg_duration_ms = total_duration_ms as f64 / records.len() as f64;
        }
        aggregate
    }
}
