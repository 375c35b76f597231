use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{LlmError, LlmResult};
use super::{Completion, CompletionRequest, LanguageModel};
use crate::domain::TokenUsage;

type Handler = Box<dyn Fn(&CompletionRequest, u32) -> LlmResult<String> + Send + Sync>;

/// Scripted [`LanguageModel`]. The handler receives the request and the zero-based
/// call index; every successful call reports the configured usage.
pub struct MockLanguageModel {
    model: String,
    handler: Handler,
    usage: TokenUsage,
    calls: AtomicU32,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLanguageModel {
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest, u32) -> LlmResult<String> + Send + Sync + 'static,
    {
        Self {
            model: "gpt-4o-mini".to_string(),
            handler: Box::new(handler),
            usage: TokenUsage::new(1_000, 0, 200),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn with_response(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_, _| Ok(text.clone()))
    }

    /// Fails every call with a provider error.
    pub fn failing() -> Self {
        Self::from_fn(|_, _| {
            Err(LlmError::Provider {
                model: "mock".to_string(),
                message: "simulated outage".to_string(),
            })
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<Completion> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.handler)(&request, index);
        self.requests.lock().push(request);

        let text = result?;
        Ok(Completion {
            text,
            usage: self.usage,
        })
    }
}
