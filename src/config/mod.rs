//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `AUDITOR_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::batch::DEFAULT_WINDOW_SIZE;
use crate::corpus::DEFAULT_CORPUS_COLLECTION;
use crate::embedding::DEFAULT_EMBEDDING_DIM;
use crate::evaluator::EvaluatorConfig;
use crate::llm::DEFAULT_MODEL_TIMEOUT;
use crate::retrieval::RetrievalConfig;

/// Default language model when `AUDITOR_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `AUDITOR_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model used for summaries and evaluation. Default: `gpt-4o-mini`.
    pub model: String,

    /// Tickets evaluated concurrently per window. Default: `3`.
    pub batch_window: usize,

    /// Model retries after the first attempt. Default: `2`.
    pub max_retries: u32,

    /// Semantic hits below this cosine similarity are dropped. Default: `0.30`.
    pub similarity_floor: f32,

    /// Cap on retrieved rules per ticket. Default: `12`.
    pub max_rules: usize,

    /// Rule token budget reported in retrieval stats. Default: `6000`.
    pub token_budget: u32,

    /// Transcript characters sent on the first model attempt. Default: `12000`.
    pub transcript_char_budget: usize,

    /// Query embedding width; must match the corpus. Default: `384`.
    pub embedding_dim: usize,

    /// Corpus snapshot JSON. Required by the binary.
    pub corpus_path: Option<PathBuf>,

    /// Qdrant endpoint. When unset the corpus is held in memory.
    pub qdrant_url: Option<String>,

    /// Qdrant collection for rule chunks. Default: `rule_chunks`.
    pub qdrant_collection: String,

    /// TTL for cached tag/category lookups. Default: 300s.
    pub corpus_cache_ttl: Duration,

    /// Where evaluation records are written. Default: `./.data/evaluations`.
    pub output_dir: PathBuf,

    /// Per-call model timeout. Default: 60s.
    pub model_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let retrieval = RetrievalConfig::default();
        let evaluator = EvaluatorConfig::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            batch_window: DEFAULT_WINDOW_SIZE,
            max_retries: evaluator.max_retries,
            similarity_floor: retrieval.similarity_floor,
            max_rules: retrieval.max_results,
            token_budget: retrieval.token_budget,
            transcript_char_budget: evaluator.transcript_char_budget,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            corpus_path: None,
            qdrant_url: None,
            qdrant_collection: DEFAULT_CORPUS_COLLECTION.to_string(),
            corpus_cache_ttl: Duration::from_secs(300),
            output_dir: PathBuf::from("./.data/evaluations"),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

impl Config {
    const ENV_MODEL: &'static str = "AUDITOR_MODEL";
    const ENV_BATCH_WINDOW: &'static str = "AUDITOR_BATCH_WINDOW";
    const ENV_MAX_RETRIES: &'static str = "AUDITOR_MAX_RETRIES";
    const ENV_SIMILARITY_FLOOR: &'static str = "AUDITOR_SIMILARITY_FLOOR";
    const ENV_MAX_RULES: &'static str = "AUDITOR_MAX_RULES";
    const ENV_TOKEN_BUDGET: &'static str = "AUDITOR_TOKEN_BUDGET";
    const ENV_TRANSCRIPT_CHAR_BUDGET: &'static str = "AUDITOR_TRANSCRIPT_CHAR_BUDGET";
    const ENV_EMBEDDING_DIM: &'static str = "AUDITOR_EMBEDDING_DIM";
    const ENV_CORPUS_PATH: &'static str = "AUDITOR_CORPUS_PATH";
    const ENV_QDRANT_URL: &'static str = "AUDITOR_QDRANT_URL";
    const ENV_QDRANT_COLLECTION: &'static str = "AUDITOR_QDRANT_COLLECTION";
    const ENV_CORPUS_CACHE_TTL_SECS: &'static str = "AUDITOR_CORPUS_CACHE_TTL_SECS";
    const ENV_OUTPUT_DIR: &'static str = "AUDITOR_OUTPUT_DIR";
    const ENV_MODEL_TIMEOUT_SECS: &'static str = "AUDITOR_MODEL_TIMEOUT_SECS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            model: Self::parse_string_from_env(Self::ENV_MODEL, defaults.model),
            batch_window: Self::parse_from_env(Self::ENV_BATCH_WINDOW, defaults.batch_window)?,
            max_retries: Self::parse_from_env(Self::ENV_MAX_RETRIES, defaults.max_retries)?,
            similarity_floor: Self::parse_from_env(
                Self::ENV_SIMILARITY_FLOOR,
                defaults.similarity_floor,
            )?,
            max_rules: Self::parse_from_env(Self::ENV_MAX_RULES, defaults.max_rules)?,
            token_budget: Self::parse_from_env(Self::ENV_TOKEN_BUDGET, defaults.token_budget)?,
            transcript_char_budget: Self::parse_from_env(
                Self::ENV_TRANSCRIPT_CHAR_BUDGET,
                defaults.transcript_char_budget,
            )?,
            embedding_dim: Self::parse_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?,
            corpus_path: Self::parse_optional_from_env(Self::ENV_CORPUS_PATH).map(PathBuf::from),
            qdrant_url: Self::parse_optional_from_env(Self::ENV_QDRANT_URL),
            qdrant_collection: Self::parse_string_from_env(
                Self::ENV_QDRANT_COLLECTION,
                defaults.qdrant_collection,
            ),
            corpus_cache_ttl: Duration::from_secs(Self::parse_from_env(
                Self::ENV_CORPUS_CACHE_TTL_SECS,
                defaults.corpus_cache_ttl.as_secs(),
            )?),
            output_dir: Self::parse_optional_from_env(Self::ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            model_timeout: Duration::from_secs(Self::parse_from_env(
                Self::ENV_MODEL_TIMEOUT_SECS,
                defaults.model_timeout.as_secs(),
            )?),
        })
    }

    /// Checks ranges and paths (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_window == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_BATCH_WINDOW,
                message: "must be at least 1".to_string(),
            });
        }
        if !(-1.0..=1.0).contains(&self.similarity_floor) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_SIMILARITY_FLOOR,
                message: format!("{} is outside [-1, 1]", self.similarity_floor),
            });
        }
        if self.max_rules == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MAX_RULES,
                message: "must be at least 1".to_string(),
            });
        }
        if self.embedding_dim == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_EMBEDDING_DIM,
                message: "must be at least 1".to_string(),
            });
        }
        if self.model_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MODEL_TIMEOUT_SECS,
                message: "must be at least 1 second".to_string(),
            });
        }

        if let Some(ref path) = self.corpus_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.output_dir.clone(),
            });
        }

        Ok(())
    }

    /// The corpus path, or an error naming the variable to set.
    pub fn require_corpus_path(&self) -> Result<&PathBuf, ConfigError> {
        self.corpus_path.as_ref().ok_or(ConfigError::MissingEnvVar {
            name: Self::ENV_CORPUS_PATH,
        })
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            similarity_floor: self.similarity_floor,
            max_results: self.max_rules,
            token_budget: self.token_budget,
            ..Default::default()
        }
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            max_retries: self.max_retries,
            transcript_char_budget: self.transcript_char_budget,
        }
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match env::var(var_name) {
            Ok(value) if !value.trim().is_empty() => {
                value
                    .trim()
                    .parse()
                    .map_err(|e: T::Err| ConfigError::InvalidValue {
                        name: var_name,
                        value: value.clone(),
                        message: e.to_string(),
                    })
            }
            _ => Ok(default),
        }
    }

    fn parse_optional_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_from_env(var_name).unwrap_or(default)
    }
}
