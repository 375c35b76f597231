use thiserror::Error;

#[derive(Debug, Error)]
/// Errors raised while registering or running guardrails.
pub enum GuardrailError {
    /// A predicate reported that it could not evaluate the ticket.
    #[error("guardrail '{guardrail_id}' failed: {message}")]
    PredicateFailed {
        guardrail_id: String,
        message: String,
    },

    /// A predicate panicked.
    #[error("guardrail '{guardrail_id}' panicked: {message}")]
    Panicked {
        guardrail_id: String,
        message: String,
    },

    /// Two guardrails were registered under the same id.
    #[error("guardrail '{id}' is already registered")]
    DuplicateId { id: String },
}
