use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model '{model}' timed out after {timeout_secs}s")]
    Timeout { model: String, timeout_secs: u64 },

    #[error("model '{model}' call failed: {message}")]
    Provider { model: String, message: String },
}

pub type LlmResult<T> = Result<T, LlmError>;
