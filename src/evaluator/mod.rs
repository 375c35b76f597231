//! Per-ticket evaluation pipeline.
//!
//! Stages run strictly in order: summarize, classify, guardrail check, retrieve,
//! prompt, call the model (with shrinking retries), sanitize, reconcile, persist.
//! Every ticket ends in a stored [`TicketEvaluation`](crate::domain::TicketEvaluation);
//! when the model or the corpus is unavailable that record is a `needs_review`
//! fallback carrying a `SYSTEM` note.

mod engine;
mod error;
pub mod prompt;
pub mod reconcile;
pub mod sanitize;
pub mod status;


pub use engine::{Evaluator, EvaluatorConfig, SYSTEM_RULE_ID, TicketEvaluator};
pub use error::EvaluationError;
pub use prompt::ShrinkLevel;
pub use reconcile::reconcile;
pub use sanitize::{SanitizedAssessment, parse_assessment, sanitize};
pub use status::determine_status;
