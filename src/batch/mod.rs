//! Batch Orchestrator: windowed concurrent evaluation of a session's tickets with
//! typed progress events.

mod events;
mod orchestrator;

#[cfg(test)]
mod tests;

pub use events::{BatchCounters, BatchItemError, BatchPhase, BatchSummary, ProgressEvent};
pub use orchestrator::{BatchOrchestrator, DEFAULT_WINDOW_SIZE};
