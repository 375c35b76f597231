use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::facts::{AgentActions, TicketFacts};
use super::finding::{Finding, FindingSet, FindingsSummary, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Pass,
    Fail,
    NeedsReview,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "pass",
            OverallStatus::Fail => "fail",
            OverallStatus::NeedsReview => "needs_review",
        }
    }

    /// Accepts `needs_review`, `needs-review` and `needs review` in any case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pass" => Some(OverallStatus::Pass),
            "fail" => Some(OverallStatus::Fail),
            "needs_review" => Some(OverallStatus::NeedsReview),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human QA workflow state. The only part of a stored evaluation that may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStatus {
    #[default]
    Pending,
    InReview,
    Approved,
    Disputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub subcategory: String,
    pub risk_level: RiskLevel,
    /// Tags whose rules must be retrieved regardless of similarity.
    pub mandatory_tags: Vec<String>,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

/// Which retrieval channel surfaced a rule. Semantic hits sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Semantic,
    MandatoryTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRule {
    pub rule_id: String,
    pub chunk_id: String,
    pub text: String,
    pub similarity: f32,
    pub source: RetrievalSource,
    pub severity: Severity,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub matched_tags: Vec<String>,
    pub token_count: u32,
}

/// Token counts for one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// All prompt tokens, cached ones included.
    pub prompt_tokens: u64,
    pub cached_prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, cached_prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            cached_prompt_tokens,
            completion_tokens,
        }
    }

    /// Prompt tokens billed at the regular input rate.
    pub fn regular_prompt_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_sub(self.cached_prompt_tokens)
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.cached_prompt_tokens += other.cached_prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl Timing {
    pub fn between(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Self {
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            started_at,
            completed_at,
            duration_ms,
        }
    }
}

/// Persisted outcome of one evaluation attempt.
///
/// Verdict fields are fixed at construction. Re-evaluating a ticket deletes the old
/// record and stores a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketEvaluation {
    pub id: Uuid,
    pub ticket_id: String,
    pub session_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub ticket_summary: String,
    pub classification: Classification,
    pub overall_status: OverallStatus,
    pub confidence: f32,
    #[serde(default)]
    pub assessment: Option<String>,
    pub findings: FindingSet,
    pub ticket_facts: TicketFacts,
    pub agent_actions: AgentActions,
    pub retrieved_rules: Vec<RetrievedRule>,
    pub guardrail_findings: Vec<Finding>,
    pub model: String,
    pub usage: TokenUsage,
    /// `usage` split by the model that spent it (summarizer and evaluator may differ).
    #[serde(default)]
    pub usage_by_model: BTreeMap<String, TokenUsage>,
    pub cost_usd: f64,
    pub timing: Timing,
    /// Number of model attempts made, 0 when the model was never reached.
    pub model_attempts: u32,
    #[serde(default)]
    pub qa_status: QaStatus,
}

impl TicketEvaluation {
    pub fn findings(&self) -> &[Finding] {
        self.findings.items()
    }

    pub fn findings_summary(&self) -> &FindingsSummary {
        self.findings.summary()
    }
}
