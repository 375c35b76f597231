//! Retrieval-augmented compliance evaluation of customer-support transcripts.
//!
//! A ticket flows through [`evaluator::Evaluator`]: summarize, classify, run the
//! deterministic guardrails, retrieve the applicable rules, ask the language model
//! for an assessment, then reconcile and persist a [`TicketEvaluation`].
//! [`batch::BatchOrchestrator`] runs a whole session in bounded concurrent windows.
//!
//! ## Modules
//! - [`domain`] - transcripts, facts, rules, findings and evaluation records
//! - [`corpus`] - rule corpus stores (in-memory, Qdrant) and the TTL cache
//! - [`embedding`] - query embedding for retrieval
//! - [`llm`] - language-model seam, genai client and rate table
//! - [`guardrails`], [`classifier`], [`summarizer`], [`retrieval`] - pipeline stages
//! - [`storage`] - persisted evaluations, queries and session aggregates
//! - [`config`] - `AUDITOR_*` environment configuration
//!
//! ## Test/Mock Support
//! [`llm::MockLanguageModel`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod batch;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod domain;
pub mod embedding;
pub mod evaluator;
pub mod guardrails;
pub mod hashing;
pub mod llm;
pub mod retrieval;
pub mod storage;
pub mod summarizer;
pub mod text;

pub use batch::{BatchOrchestrator, BatchSummary, ProgressEvent};
pub use config::{Config, ConfigError};
pub use corpus::{CachedCorpus, CorpusError, InMemoryCorpus, QdrantCorpus, RuleCorpusStore};
pub use domain::{
    Finding, FindingType, OverallStatus, QaStatus, Severity, TicketEvaluation, TicketFacts,
    TicketInput, Transcript,
};
pub use embedding::{Embedder, EmbeddingError, HashedEmbedder};
pub use evaluator::{EvaluationError, Evaluator, EvaluatorConfig, TicketEvaluator};
pub use guardrails::{Guardrail, GuardrailEngine};
#[cfg(any(test, feature = "mock"))]
pub use llm::MockLanguageModel;
pub use llm::{GenaiModel, LanguageModel, LlmError, RateTable};
pub use retrieval::{HybridRetriever, RetrievalConfig};
pub use storage::{
    EvaluationQuery, EvaluationStore, FileEvaluationStore, MemoryEvaluationStore,
    SessionAggregate, StorageError,
};
