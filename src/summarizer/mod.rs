//! Short transcript synopses with a deterministic fallback.
//!
//! The summary feeds both the classifier and the retrieval query, so
//! [`Summarizer::summarize`] always returns text: a failed or empty model call falls
//! back to the head of the transcript.


use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::{TokenUsage, Transcript};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::text::{truncate_chars, truncate_with_marker};

pub const DEFAULT_CHAR_BUDGET: usize = 12_000;
pub const DEFAULT_FALLBACK_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You summarize customer-support conversations for a compliance \
reviewer. Reply with 2-3 plain sentences covering the customer's issue, what the agent did, \
and how the conversation ended. No lists, no preamble.";

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub usage: TokenUsage,
    /// `true` when the text is the transcript head rather than a model summary.
    pub fell_back: bool,
}

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    char_budget: usize,
    fallback_chars: usize,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            char_budget: DEFAULT_CHAR_BUDGET,
            fallback_chars: DEFAULT_FALLBACK_CHARS,
        }
    }

    /// Model the summary tokens are billed against.
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn with_char_budget(mut self, chars: usize) -> Self {
        self.char_budget = chars;
        self
    }

    pub fn with_fallback_chars(mut self, chars: usize) -> Self {
        self.fallback_chars = chars;
        self
    }

    #[instrument(skip(self, transcript))]
    pub async fn summarize(&self, transcript: &Transcript) -> Summary {
        let full_text = transcript.full_text();
        let request = CompletionRequest::new(
            SYSTEM_PROMPT,
            format!(
                "Conversation:\n{}",
                truncate_with_marker(&full_text, self.char_budget)
            ),
        )
        .with_max_tokens(200)
        .with_temperature(0.2);

        match self.model.complete(request).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                debug!(chars = completion.text.len(), "Transcript summarized");
                Summary {
                    text: completion.text.trim().to_string(),
                    usage: completion.usage,
                    fell_back: false,
                }
            }
            Ok(completion) => {
                warn!("Summary model returned empty text, using transcript head");
                self.fallback(&full_text, completion.usage)
            }
            Err(e) => {
                warn!(error = %e, "Summary model call failed, using transcript head");
                self.fallback(&full_text, TokenUsage::default())
            }
        }
    }

    fn fallback(&self, full_text: &str, usage: TokenUsage) -> Summary {
        let head = truncate_chars(full_text.trim(), self.fallback_chars);
        let text = if head.is_empty() {
            "(empty transcript)".to_string()
        } else {
            head.to_string()
        };
        Summary {
            text,
            usage,
            fell_back: true,
        }
    }
}
