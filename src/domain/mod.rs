//! Records exchanged with the rest of the QA system.
//!
//! Inputs (transcripts, ticket facts, agent actions, rule documents and chunks) arrive
//! from collaborators; [`TicketEvaluation`] is the one record the pipeline produces.

pub mod evaluation;
pub mod facts;
pub mod finding;
pub mod rules;
pub mod transcript;

#[cfg(test)]
mod tests;

pub use evaluation::{
    Classification, OverallStatus, QaStatus, RetrievalSource, RetrievedRule, RiskLevel,
    TicketEvaluation, Timing, TokenUsage,
};
pub use facts::{AgentActions, AuthMethod, Flag, RestrictionState, TicketFacts};
pub use finding::{
    Evidence, Finding, FindingSet, FindingSource, FindingType, FindingsSummary, RuleReference,
    Severity, Speaker, Verification, normalize_speaker,
};
pub use rules::{Certainty, ChunkMetadata, RuleChunk, RuleCondition, RuleDocument};
pub use transcript::{Message, TicketInput, Transcript, Utterance};
