use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::CorpusError;
use super::similarity::cosine_similarity;
use super::store::{RuleCorpusStore, ScoredChunk, SearchFilter};
use crate::domain::{RuleChunk, RuleDocument};

/// Output of the corpus preparation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    #[serde(default)]
    pub rules: Vec<RuleDocument>,
    #[serde(default)]
    pub chunks: Vec<RuleChunk>,
}

#[derive(Default)]
struct CorpusState {
    rules: HashMap<String, RuleDocument>,
    chunks: Vec<RuleChunk>,
}

/// In-process corpus with a brute-force similarity scan.
#[derive(Default)]
pub struct InMemoryCorpus {
    state: RwLock<CorpusState>,
}

impl std::fmt::Debug for InMemoryCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryCorpus")
            .field("rules", &state.rules.len())
            .field("chunks", &state.chunks.len())
            .finish()
    }
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a corpus from a snapshot, rejecting chunks whose rule is missing.
    pub fn from_snapshot(snapshot: CorpusSnapshot) -> Result<Self, CorpusError> {
        let corpus = Self::new();
        for rule in snapshot.rules {
            corpus.upsert_rule(rule);
        }
        corpus.upsert_chunks(snapshot.chunks)?;
        Ok(corpus)
    }

    /// Reads a [`CorpusSnapshot`] JSON file.
    pub async fn load_json(path: &Path) -> Result<Self, CorpusError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| CorpusError::SnapshotRead {
                path: path.to_path_buf(),
                source,
            })?;
        let snapshot: CorpusSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| CorpusError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;

        let corpus = Self::from_snapshot(snapshot)?;
        info!(
            path = %path.display(),
            rules = corpus.rule_count(),
            chunks = corpus.chunk_count(),
            "Rule corpus loaded"
        );
        Ok(corpus)
    }

    pub fn upsert_rule(&self, rule: RuleDocument) {
        self.state.write().rules.insert(rule.id.clone(), rule);
    }

    /// Inserts or replaces chunks by `chunk_id`.
    pub fn upsert_chunks(&self, chunks: Vec<RuleChunk>) -> Result<(), CorpusError> {
        let mut state = self.state.write();
        for chunk in &chunks {
            if !state.rules.contains_key(&chunk.rule_id) {
                return Err(CorpusError::UnknownRule {
                    chunk_id: chunk.chunk_id.clone(),
                    rule_id: chunk.rule_id.clone(),
                });
            }
        }
        for chunk in chunks {
            match state
                .chunks
                .iter_mut()
                .find(|c| c.chunk_id == chunk.chunk_id)
            {
                Some(existing) => *existing = chunk,
                None => state.chunks.push(chunk),
            }
        }
        Ok(())
    }

    /// Marks every chunk of a rule inactive. Returns the number of chunks touched.
    pub fn deactivate_rule(&self, rule_id: &str) -> usize {
        let mut state = self.state.write();
        let mut touched = 0;
        for chunk in state.chunks.iter_mut().filter(|c| c.rule_id == rule_id) {
            chunk.active = false;
            touched += 1;
        }
        touched
    }

    pub fn rule_count(&self) -> usize {
        self.state.read().rules.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.state.read().chunks.len()
    }

    /// Fails on the first chunk whose embedding is not `expected` wide.
    pub fn check_dimension(&self, expected: usize) -> Result<(), CorpusError> {
        let state = self.state.read();
        match state.chunks.iter().find(|c| c.embedding.len() != expected) {
            Some(chunk) => Err(CorpusError::InvalidDimension {
                expected,
                actual: chunk.embedding.len(),
            }),
            None => Ok(()),
        }
    }

    /// Copy of the current contents, e.g. for seeding an index-backed store.
    pub fn snapshot(&self) -> CorpusSnapshot {
        let state = self.state.read();
        CorpusSnapshot {
            rules: state.rules.values().cloned().collect(),
            chunks: state.chunks.clone(),
        }
    }
}

impl RuleCorpusStore for InMemoryCorpus {
    async fn find_by_tags(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        if tags.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let state = self.state.read();
        Ok(state
            .chunks
            .iter()
            .filter(|c| c.active && c.has_any_tag(tags))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        let state = self.state.read();
        Ok(state
            .chunks
            .iter()
            .filter(|c| c.active && c.metadata.category.eq_ignore_ascii_case(category_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn semantic_search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>, CorpusError> {
        let state = self.state.read();

        let mut results: Vec<ScoredChunk> = Vec::new();
        for chunk in state.chunks.iter().filter(|c| filter.matches(c)) {
            if chunk.embedding.len() != query_embedding.len() {
                return Err(CorpusError::InvalidDimension {
                    expected: chunk.embedding.len(),
                    actual: query_embedding.len(),
                });
            }
            results.push(ScoredChunk {
                similarity: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            });
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(filter.limit);

        debug!(
            scanned = state.chunks.len(),
            returned = results.len(),
            "In-memory semantic search"
        );
        Ok(results)
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<RuleDocument>, CorpusError> {
        Ok(self.state.read().rules.get(rule_id).cloned())
    }
}
