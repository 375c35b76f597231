use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, instrument};

use super::events::{BatchCounters, BatchItemError, BatchPhase, BatchSummary, ProgressEvent};
use crate::domain::TicketInput;
use crate::evaluator::TicketEvaluator;

pub const DEFAULT_WINDOW_SIZE: usize = 3;
const EVENT_CAPACITY: usize = 256;

/// Evaluates a session's tickets in fixed-size concurrent windows.
///
/// Tickets within a window run concurrently; the next window starts only after the
/// whole previous window has finished. A failing or panicking ticket is recorded in
/// the summary and never affects its siblings.
pub struct BatchOrchestrator {
    evaluator: Arc<dyn TicketEvaluator>,
    window_size: usize,
    events: broadcast::Sender<ProgressEvent>,
}

impl BatchOrchestrator {
    pub fn new(evaluator: Arc<dyn TicketEvaluator>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            evaluator,
            window_size: DEFAULT_WINDOW_SIZE,
            events,
        }
    }

    /// Values below 1 are treated as 1.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Receiver for progress events. Slow receivers lag; the orchestrator never waits.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Progress events as a stream. Events missed by a lagging consumer are skipped.
    pub fn progress_stream(&self) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|event| event.ok())
    }

    #[instrument(skip(self, tickets), fields(tickets = tickets.len(), window = self.window_size))]
    pub async fn run(&self, session_id: &str, tickets: &[TicketInput]) -> BatchSummary {
        let started_at = Utc::now();
        let windows = tickets.len().div_ceil(self.window_size);
        let mut counters = BatchCounters::new(tickets.len());
        let mut errors = Vec::new();
        let mut evaluation_ids = Vec::with_capacity(tickets.len());

        info!(session_id, "Batch started");
        self.emit(
            session_id,
            BatchPhase::Started {
                total: tickets.len(),
                window_size: self.window_size,
            },
            &counters,
        );

        for (index, window) in tickets.chunks(self.window_size).enumerate() {
            let results = join_all(window.iter().map(|ticket| {
                AssertUnwindSafe(self.evaluator.evaluate_ticket(session_id, ticket)).catch_unwind()
            }))
            .await;

            for (ticket, result) in window.iter().zip(results) {
                let message = match result {
                    Ok(Ok(evaluation)) => {
                        counters.record(&evaluation);
                        evaluation_ids.push(evaluation.id);
                        continue;
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(panic) => format!("evaluation panicked: {}", panic_message(&*panic)),
                };
                error!(ticket_id = %ticket.ticket_id, error = %message, "Ticket evaluation failed");
                counters.record_failure();
                errors.push(BatchItemError {
                    ticket_id: ticket.ticket_id.clone(),
                    message,
                });
            }

            debug!(
                window = index + 1,
                windows,
                completed = counters.completed,
                failed = counters.failed,
                "Window complete"
            );
            self.emit(
                session_id,
                BatchPhase::WindowCompleted {
                    window: index + 1,
                    windows,
                },
                &counters,
            );
        }

        let completed_at = Utc::now();
        let duration_ms = (completed_at - started_at).num_milliseconds().max(0) as u64;
        self.emit(session_id, BatchPhase::Completed { duration_ms }, &counters);
        info!(
            session_id,
            completed = counters.completed,
            failed = counters.failed,
            pass = counters.pass,
            fail = counters.fail,
            needs_review = counters.needs_review,
            cost_usd = counters.cost_usd,
            duration_ms,
            "Batch completed"
        );

        BatchSummary {
            session_id: session_id.to_string(),
            counters,
            errors,
            evaluation_ids,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    fn emit(&self, session_id: &str, phase: BatchPhase, counters: &BatchCounters) {
        // no receivers is fine
        let _ = self.events.send(ProgressEvent {
            session_id: session_id.to_string(),
            phase,
            counters: counters.clone(),
            emitted_at: Utc::now(),
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
