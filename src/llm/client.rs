use std::time::Duration;

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, Usage};
use tracing::{debug, instrument, warn};

use super::error::{LlmError, LlmResult};
use super::{Completion, CompletionRequest, LanguageModel};
use crate::domain::TokenUsage;

/// Default per-call timeout.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// [`LanguageModel`] backed by the `genai` multi-provider client.
///
/// Provider credentials come from the usual environment variables (`OPENAI_API_KEY`, ...).
pub struct GenaiModel {
    client: Client,
    model: String,
    timeout: Duration,
}

impl GenaiModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_client(Client::default(), model)
    }

    pub fn with_client(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn token_usage(usage: &Usage) -> TokenUsage {
    let to_u64 = |v: Option<i32>| v.map(|n| n.max(0) as u64).unwrap_or(0);
    let cached = usage
        .prompt_tokens_details
        .as_ref()
        .and_then(|d| d.cached_tokens);

    TokenUsage::new(
        to_u64(usage.prompt_tokens),
        to_u64(cached),
        to_u64(usage.completion_tokens),
    )
}

#[async_trait]
impl LanguageModel for GenaiModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> LlmResult<Completion> {
        let chat_req = ChatRequest::new(vec![ChatMessage::user(request.user)])
            .with_system(request.system);
        let options = ChatOptions::default()
            .with_max_tokens(request.max_tokens)
            .with_temperature(request.temperature);

        let response = tokio::time::timeout(
            self.timeout,
            self.client.exec_chat(&self.model, chat_req, Some(&options)),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            model: self.model.clone(),
            timeout_secs: self.timeout.as_secs(),
        })?
        .map_err(|e| LlmError::Provider {
            model: self.model.clone(),
            message: e.to_string(),
        })?;

        let usage = token_usage(&response.usage);
        let text = response.first_text().unwrap_or_default().to_string();
        if text.trim().is_empty() {
            // still billed; the caller rejects blank text
            warn!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model returned no text"
            );
        }

        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Model call completed"
        );
        Ok(Completion { text, usage })
    }
}
