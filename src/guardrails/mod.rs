//! Guardrail Engine: deterministic compliance checks that never call a model.
//!
//! Each [`Guardrail`] pairs an applicability predicate over [`TicketFacts`] with a
//! check over the whole [`GuardrailContext`]. [`GuardrailEngine::quick_check`] runs only
//! the applicable subset. Findings produced here are authoritative: the evaluator merges
//! them into the final list and the model can never drop them.
//!
//! [`TicketFacts`]: crate::domain::TicketFacts

pub mod builtin;
mod engine;
mod error;

#[cfg(test)]
mod tests;

pub use engine::{Guardrail, GuardrailContext, GuardrailEngine};
pub use error::GuardrailError;
