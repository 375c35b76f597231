//! Language-model seam.
//!
//! The pipeline only talks to [`LanguageModel`]. [`GenaiModel`] is the production
//! client; [`MockLanguageModel`] scripts responses for tests.

pub mod client;
pub mod cost;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use client::{DEFAULT_MODEL_TIMEOUT, GenaiModel};
pub use cost::{ModelRates, RateTable};
pub use error::{LlmError, LlmResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLanguageModel;

use async_trait::async_trait;

use crate::domain::TokenUsage;

/// One chat-style completion call: a system instruction and a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2048,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[async_trait]
/// A chat model that turns a [`CompletionRequest`] into text plus token usage.
pub trait LanguageModel: Send + Sync {
    /// Model identifier used for logging and cost lookup.
    fn model_id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> LlmResult<Completion>;
}
