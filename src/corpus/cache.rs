//! TTL cache over the exact-match corpus lookups.
//!
//! Tag, category and rule lookups are cached for a fixed time-to-live. Semantic search
//! is always forwarded, since query embeddings rarely repeat.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use super::error::CorpusError;
use super::store::{RuleCorpusStore, ScoredChunk, SearchFilter};
use crate::domain::{RuleChunk, RuleDocument};

pub struct CachedCorpus<S> {
    inner: S,
    by_tags: Cache<String, Arc<Vec<RuleChunk>>>,
    by_category: Cache<String, Arc<Vec<RuleChunk>>>,
    rules: Cache<String, Option<RuleDocument>>,
}

impl<S> CachedCorpus<S> {
    const DEFAULT_CAPACITY: u64 = 1_000;

    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: S, ttl: Duration, capacity: u64) -> Self {
        Self {
            inner,
            by_tags: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            by_category: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            rules: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drops every cached entry. Call after the underlying corpus changes.
    pub fn invalidate(&self) {
        self.by_tags.invalidate_all();
        self.by_category.invalidate_all();
        self.rules.invalidate_all();
        debug!("Corpus cache invalidated");
    }
}

fn tags_key(tags: &[String], limit: usize) -> String {
    let mut normalized: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    normalized.sort();
    normalized.dedup();
    format!("{}#{limit}", normalized.join("|"))
}

impl<S: RuleCorpusStore> RuleCorpusStore for CachedCorpus<S> {
    async fn find_by_tags(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        let key = tags_key(tags, limit);
        if let Some(hit) = self.by_tags.get(&key) {
            return Ok(hit.as_ref().clone());
        }
        let chunks = self.inner.find_by_tags(tags, limit).await?;
        self.by_tags.insert(key, Arc::new(chunks.clone()));
        Ok(chunks)
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        let key = format!("{}#{limit}", category_id.to_lowercase());
        if let Some(hit) = self.by_category.get(&key) {
            return Ok(hit.as_ref().clone());
        }
        let chunks = self.inner.find_by_category(category_id, limit).await?;
        self.by_category.insert(key, Arc::new(chunks.clone()));
        Ok(chunks)
    }

    async fn semantic_search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>, CorpusError> {
        self.inner.semantic_search(query_embedding, filter).await
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<RuleDocument>, CorpusError> {
        if let Some(hit) = self.rules.get(rule_id) {
            return Ok(hit);
        }
        let rule = self.inner.get_rule(rule_id).await?;
        self.rules.insert(rule_id.to_string(), rule.clone());
        Ok(rule)
    }
}
