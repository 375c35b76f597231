use std::future::Future;

use serde::{Deserialize, Serialize};

use super::error::CorpusError;
use crate::domain::{RuleChunk, RuleDocument, Severity};

/// Filter for [`RuleCorpusStore::semantic_search`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub limit: usize,
    #[serde(default)]
    pub category_id: Option<String>,
    /// When non-empty, only chunks carrying at least one of these tags match.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub min_severity: Option<Severity>,
    #[serde(default)]
    pub exclude_rule_ids: Vec<String>,
}

impl SearchFilter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            category_id: None,
            tags: Vec::new(),
            min_severity: None,
            exclude_rule_ids: Vec::new(),
        }
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn exclude_rules(mut self, rule_ids: Vec<String>) -> Self {
        self.exclude_rule_ids = rule_ids;
        self
    }

    /// Evaluates the non-similarity part of the filter against one chunk.
    pub fn matches(&self, chunk: &RuleChunk) -> bool {
        if !chunk.active {
            return false;
        }
        if let Some(category) = &self.category_id
            && !chunk.metadata.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if !self.tags.is_empty() && !chunk.has_any_tag(&self.tags) {
            return false;
        }
        if let Some(min) = self.min_severity
            && chunk.metadata.severity < min
        {
            return false;
        }
        !self.exclude_rule_ids.iter().any(|id| id == &chunk.rule_id)
    }
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: RuleChunk,
    pub similarity: f32,
}

/// Read interface over the rule corpus.
pub trait RuleCorpusStore: Send + Sync {
    /// Active chunks carrying any of `tags`, in no particular order.
    fn find_by_tags(
        &self,
        tags: &[String],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RuleChunk>, CorpusError>> + Send;

    /// Active chunks in `category_id`.
    fn find_by_category(
        &self,
        category_id: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RuleChunk>, CorpusError>> + Send;

    /// Top-`filter.limit` active chunks by cosine similarity, descending.
    fn semantic_search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
    ) -> impl Future<Output = Result<Vec<ScoredChunk>, CorpusError>> + Send;

    /// The rule document a chunk belongs to.
    fn get_rule(
        &self,
        rule_id: &str,
    ) -> impl Future<Output = Result<Option<RuleDocument>, CorpusError>> + Send;
}
