//! Rule Corpus Store: rule documents plus their embedded chunks.
//!
//! [`RuleCorpusStore`] is read-only during evaluation. [`InMemoryCorpus`] performs a
//! brute-force cosine scan; [`QdrantCorpus`] delegates the scan to a Qdrant collection;
//! [`CachedCorpus`] adds a TTL cache over the exact-match lookups of either.

pub mod cache;
pub mod error;
pub mod memory;
pub mod qdrant;
pub mod similarity;
pub mod store;


pub use cache::CachedCorpus;
pub use error::CorpusError;
pub use memory::{CorpusSnapshot, InMemoryCorpus};
pub use qdrant::QdrantCorpus;
pub use similarity::cosine_similarity;
pub use store::{RuleCorpusStore, ScoredChunk, SearchFilter};

/// Default Qdrant collection for rule chunks.
pub const DEFAULT_CORPUS_COLLECTION: &str = "rule_chunks";
