use std::collections::HashMap;

use parking_lot::RwLock;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, Range,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

use super::error::CorpusError;
use super::memory::CorpusSnapshot;
use super::store::{RuleCorpusStore, ScoredChunk, SearchFilter};
use crate::domain::{RuleChunk, RuleDocument};
use crate::hashing::chunk_point_id;

const CHUNK_JSON_KEY: &str = "chunk_json";

/// Rule corpus backed by a Qdrant collection (cosine distance).
///
/// Chunks live in the collection; rule documents are held in memory because they are
/// only ever fetched by id.
pub struct QdrantCorpus {
    client: Qdrant,
    url: String,
    collection: String,
    vector_size: u64,
    rules: RwLock<HashMap<String, RuleDocument>>,
}

impl std::fmt::Debug for QdrantCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantCorpus")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .field("vector_size", &self.vector_size)
            .finish()
    }
}

impl QdrantCorpus {
    /// Creates a client for `url`. Does not touch the collection.
    pub fn connect(url: &str, collection: &str, vector_size: u64) -> Result<Self, CorpusError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| CorpusError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            vector_size,
            rules: RwLock::new(HashMap::new()),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn health_check(&self) -> Result<(), CorpusError> {
        self.client
            .health_check()
            .await
            .map_err(|e| self.unreachable(e))?;
        Ok(())
    }

    /// Creates the collection if it does not exist.
    pub async fn ensure_collection(&self) -> Result<(), CorpusError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| self.unreachable(e))?;

        if !exists {
            let vectors_config = VectorParamsBuilder::new(self.vector_size, Distance::Cosine);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(vectors_config)
                        .on_disk_payload(true),
                )
                .await
                .map_err(|e| CorpusError::UpsertFailed {
                    collection: self.collection.clone(),
                    message: e.to_string(),
                })?;
            info!(collection = %self.collection, "Created rule chunk collection");
        }

        Ok(())
    }

    /// Loads rules into memory and upserts every chunk as a point.
    pub async fn index_snapshot(&self, snapshot: CorpusSnapshot) -> Result<(), CorpusError> {
        {
            let mut rules = self.rules.write();
            for rule in snapshot.rules {
                rules.insert(rule.id.clone(), rule);
            }
        }

        if snapshot.chunks.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(snapshot.chunks.len());
        for chunk in &snapshot.chunks {
            if chunk.embedding.len() as u64 != self.vector_size {
                return Err(CorpusError::InvalidDimension {
                    expected: self.vector_size as usize,
                    actual: chunk.embedding.len(),
                });
            }
            points.push(PointStruct::new(
                chunk_point_id(&chunk.chunk_id),
                chunk.embedding.clone(),
                self.payload_for(chunk)?,
            ));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| CorpusError::UpsertFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        info!(collection = %self.collection, chunks = count, "Indexed rule chunks");
        Ok(())
    }

    fn payload_for(&self, chunk: &RuleChunk) -> Result<Payload, CorpusError> {
        let chunk_json = serde_json::to_string(chunk).map_err(|e| self.upsert_failed(e))?;
        let tags: Vec<String> = chunk.metadata.tags.iter().map(|t| t.to_lowercase()).collect();

        Payload::try_from(serde_json::json!({
            "rule_id": chunk.rule_id,
            "category": chunk.metadata.category.to_lowercase(),
            "tags": tags,
            "severity_rank": chunk.metadata.severity.rank(),
            "active": chunk.active,
            CHUNK_JSON_KEY: chunk_json,
        }))
        .map_err(|e| self.upsert_failed(e))
    }

    fn build_filter(filter: &SearchFilter) -> Filter {
        let mut must = vec![Condition::matches("active", true)];
        if let Some(category) = &filter.category_id {
            must.push(Condition::matches("category", category.to_lowercase()));
        }
        if !filter.tags.is_empty() {
            must.push(Condition::matches("tags", lowercase(&filter.tags)));
        }
        if let Some(min) = filter.min_severity {
            must.push(Condition::range(
                "severity_rank",
                Range {
                    gte: Some(f64::from(min.rank())),
                    ..Default::default()
                },
            ));
        }

        let mut must_not = Vec::new();
        if !filter.exclude_rule_ids.is_empty() {
            must_not.push(Condition::matches(
                "rule_id",
                filter.exclude_rule_ids.clone(),
            ));
        }

        Filter {
            must,
            must_not,
            ..Default::default()
        }
    }

    async fn scroll(&self, filter: Filter, limit: usize) -> Result<Vec<RuleChunk>, CorpusError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(filter)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await
            .map_err(|e| self.search_failed(e))?;

        response
            .result
            .into_iter()
            .map(|point| {
                let point_id = point_num_id(point.id.as_ref());
                decode_chunk(point_id, &point.payload)
            })
            .collect()
    }

    fn unreachable(&self, e: impl std::fmt::Display) -> CorpusError {
        CorpusError::Unreachable {
            url: self.url.clone(),
            message: e.to_string(),
        }
    }

    fn search_failed(&self, e: impl std::fmt::Display) -> CorpusError {
        CorpusError::SearchFailed {
            collection: self.collection.clone(),
            message: e.to_string(),
        }
    }

    fn upsert_failed(&self, e: impl std::fmt::Display) -> CorpusError {
        CorpusError::UpsertFailed {
            collection: self.collection.clone(),
            message: e.to_string(),
        }
    }
}

fn lowercase(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

fn point_num_id(id: Option<&qdrant_client::qdrant::PointId>) -> u64 {
    use qdrant_client::qdrant::point_id::PointIdOptions;

    match id.and_then(|pid| pid.point_id_options.as_ref()) {
        Some(PointIdOptions::Num(n)) => *n,
        _ => 0,
    }
}

fn decode_chunk(
    point_id: u64,
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Result<RuleChunk, CorpusError> {
    let raw = payload
        .get(CHUNK_JSON_KEY)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CorpusError::CorruptPayload {
            point_id,
            message: format!("missing '{CHUNK_JSON_KEY}'"),
        })?;

    serde_json::from_str(raw).map_err(|e| CorpusError::CorruptPayload {
        point_id,
        message: e.to_string(),
    })
}

impl RuleCorpusStore for QdrantCorpus {
    async fn find_by_tags(
        &self,
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::must([
            Condition::matches("active", true),
            Condition::matches("tags", lowercase(tags)),
        ]);
        self.scroll(filter, limit).await
    }

    async fn find_by_category(
        &self,
        category_id: &str,
        limit: usize,
    ) -> Result<Vec<RuleChunk>, CorpusError> {
        let filter = Filter::must([
            Condition::matches("active", true),
            Condition::matches("category", category_id.to_lowercase()),
        ]);
        self.scroll(filter, limit).await
    }

    async fn semantic_search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>, CorpusError> {
        if query_embedding.len() as u64 != self.vector_size {
            return Err(CorpusError::InvalidDimension {
                expected: self.vector_size as usize,
                actual: query_embedding.len(),
            });
        }

        let search = SearchPointsBuilder::new(
            &self.collection,
            query_embedding.to_vec(),
            filter.limit as u64,
        )
        .filter(Self::build_filter(filter))
        .with_payload(true);

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| self.search_failed(e))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let point_id = point_num_id(point.id.as_ref());
                Ok(ScoredChunk {
                    chunk: decode_chunk(point_id, &point.payload)?,
                    similarity: point.score.clamp(-1.0, 1.0),
                })
            })
            .collect::<Result<Vec<_>, CorpusError>>()?;

        debug!(
            collection = %self.collection,
            returned = results.len(),
            "Qdrant semantic search"
        );
        Ok(results)
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<RuleDocument>, CorpusError> {
        Ok(self.rules.read().get(rule_id).cloned())
    }
}
