//! Hybrid Retriever: semantic search plus mandatory-tag inclusion.
//!
//! Semantic search alone can miss a rule that policy requires (a jurisdiction's
//! regulation, say) when its wording is not the closest match. The tag channel pulls
//! such rules in regardless of similarity.

mod error;

#[cfg(test)]
mod tests;

pub use error::RetrievalError;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::corpus::{RuleCorpusStore, SearchFilter};
use crate::domain::{
    AgentActions, Classification, RetrievalSource, RetrievedRule, RuleChunk, TicketFacts,
};
use crate::embedding::{Embedder, validate_embedding_dim};
use crate::text::estimate_tokens;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from semantic search.
    pub semantic_limit: usize,
    /// Candidates requested from the tag lookup, per mandatory tag.
    pub tag_limit: usize,
    /// Semantic hits below this similarity are discarded.
    pub similarity_floor: f32,
    /// Cap on merged results, applied after ordering.
    pub max_results: usize,
    /// Reported against, never enforced by dropping rules.
    pub token_budget: u32,
    /// Similarity assigned to rules reached only through a mandatory tag.
    pub mandatory_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_limit: 10,
            tag_limit: 10,
            similarity_floor: 0.30,
            max_results: 12,
            token_budget: 6_000,
            mandatory_similarity: 0.5,
        }
    }
}

/// Ticket context the retriever embeds and filters on.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalQuery<'a> {
    pub summary: &'a str,
    pub entities: &'a [String],
    pub facts: &'a TicketFacts,
    pub actions: &'a AgentActions,
    pub classification: &'a Classification,
}

impl RetrievalQuery<'_> {
    /// Single text representing the whole ticket context.
    pub fn context_text(&self) -> String {
        let mut parts = vec![self.summary.trim().to_string()];
        parts.push(format!(
            "category: {} / {}",
            self.classification.category, self.classification.subcategory
        ));
        if !self.entities.is_empty() {
            parts.push(format!("entities: {}", self.entities.join(", ")));
        }
        parts.extend(self.facts.describe());
        parts.extend(self.actions.describe());
        parts.join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub semantic_candidates: usize,
    pub below_floor: usize,
    pub tag_candidates: usize,
    /// Rules present only because of a mandatory tag.
    pub tag_only: usize,
    /// Rules dropped by the result cap.
    pub truncated: usize,
    pub total_tokens: u32,
    pub token_budget: u32,
    pub over_budget: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub rules: Vec<RetrievedRule>,
    pub stats: RetrievalStats,
}

pub struct HybridRetriever<S, E> {
    store: Arc<S>,
    embedder: Arc<E>,
    config: RetrievalConfig,
}

impl<S: RuleCorpusStore, E: Embedder> HybridRetriever<S, E> {
    pub fn new(store: Arc<S>, embedder: Arc<E>, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    #[instrument(skip(self, query), fields(category = %query.classification.category))]
    pub async fn retrieve(
        &self,
        query: &RetrievalQuery<'_>,
    ) -> Result<RetrievalResult, RetrievalError> {
        let mut stats = RetrievalStats {
            token_budget: self.config.token_budget,
            ..Default::default()
        };

        let embedding = self.embedder.embed(&query.context_text()).await?;
        validate_embedding_dim(&embedding, self.embedder.dimension())?;
        let semantic = self
            .store
            .semantic_search(&embedding, &SearchFilter::new(self.config.semantic_limit))
            .await?;
        stats.semantic_candidates = semantic.len();

        // best chunk per rule
        let mut by_rule: HashMap<String, RetrievedRule> = HashMap::new();
        for hit in semantic {
            if hit.similarity < self.config.similarity_floor {
                stats.below_floor += 1;
                continue;
            }
            let candidate = to_retrieved(&hit.chunk, hit.similarity, RetrievalSource::Semantic);
            match by_rule.get(&candidate.rule_id) {
                Some(existing) if existing.similarity >= candidate.similarity => {}
                _ => {
                    by_rule.insert(candidate.rule_id.clone(), candidate);
                }
            }
        }

        // per tag, so a broad tag cannot exhaust the limit for a narrow one
        let mandatory_tags = &query.classification.mandatory_tags;
        let mut tagged: Vec<RuleChunk> = Vec::new();
        for tag in mandatory_tags {
            let chunks = self
                .store
                .find_by_tags(std::slice::from_ref(tag), self.config.tag_limit)
                .await?;
            for chunk in chunks {
                if !tagged.iter().any(|c| c.chunk_id == chunk.chunk_id) {
                    tagged.push(chunk);
                }
            }
        }
        stats.tag_candidates = tagged.len();

        for chunk in tagged {
            let matched = chunk.matching_tags(mandatory_tags);
            match by_rule.get_mut(&chunk.rule_id) {
                Some(existing) => {
                    for tag in matched {
                        if !existing.matched_tags.contains(&tag) {
                            existing.matched_tags.push(tag);
                        }
                    }
                }
                None => {
                    let mut rule = to_retrieved(
                        &chunk,
                        self.config.mandatory_similarity,
                        RetrievalSource::MandatoryTag,
                    );
                    rule.matched_tags = matched;
                    stats.tag_only += 1;
                    by_rule.insert(rule.rule_id.clone(), rule);
                }
            }
        }

        let mut rules: Vec<RetrievedRule> = by_rule.into_values().collect();
        rules.sort_by(rank_order);
        if rules.len() > self.config.max_results {
            stats.truncated = rules.len() - self.config.max_results;
            rules.truncate(self.config.max_results);
        }

        stats.total_tokens = rules.iter().map(|r| r.token_count).sum();
        stats.over_budget = stats.total_tokens > stats.token_budget;

        debug!(
            semantic = stats.semantic_candidates,
            below_floor = stats.below_floor,
            tag_only = stats.tag_only,
            returned = rules.len(),
            total_tokens = stats.total_tokens,
            over_budget = stats.over_budget,
            "Rules retrieved"
        );
        Ok(RetrievalResult { rules, stats })
    }
}

fn to_retrieved(chunk: &RuleChunk, similarity: f32, source: RetrievalSource) -> RetrievedRule {
    let token_count = if chunk.token_count > 0 {
        chunk.token_count
    } else {
        estimate_tokens(&chunk.text)
    };
    RetrievedRule {
        rule_id: chunk.rule_id.clone(),
        chunk_id: chunk.chunk_id.clone(),
        text: chunk.text.clone(),
        similarity,
        source,
        severity: chunk.metadata.severity,
        category: chunk.metadata.category.clone(),
        tags: chunk.metadata.tags.clone(),
        matched_tags: Vec::new(),
        token_count,
    }
}

/// Source (semantic first), then similarity descending, then severity descending.
/// Rule id breaks remaining ties so the order is deterministic.
pub fn rank_order(a: &RetrievedRule, b: &RetrievedRule) -> Ordering {
    a.source
        .cmp(&b.source)
        .then_with(|| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.severity.cmp(&a.severity))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
}
