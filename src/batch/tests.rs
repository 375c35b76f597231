use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_stream::StreamExt;
use uuid::Uuid;

use super::*;
use crate::domain::{
    AgentActions, Classification, FindingSet, OverallStatus, QaStatus, TicketEvaluation,
    TicketFacts, TicketInput, Timing, TokenUsage, Transcript,
};
use crate::evaluator::{EvaluationError, TicketEvaluator};

fn tickets(n: usize) -> Vec<TicketInput> {
    (1..=n)
        .map(|i| TicketInput::new(format!("T-{i}"), Transcript::merged(format!("ticket {i}"))))
        .collect()
}

fn evaluation(session_id: &str, ticket_id: &str, status: OverallStatus) -> TicketEvaluation {
    let now = Utc::now();
    TicketEvaluation {
        id: Uuid::new_v4(),
        ticket_id: ticket_id.to_string(),
        session_id: session_id.to_string(),
        agent_id: None,
        ticket_summary: "summary".to_string(),
        classification: Classification::default(),
        overall_status: status,
        confidence: 0.8,
        assessment: None,
        findings: FindingSet::default(),
        ticket_facts: TicketFacts::default(),
        agent_actions: AgentActions::default(),
        retrieved_rules: Vec::new(),
        guardrail_findings: Vec::new(),
        model: "gpt-4o-mini".to_string(),
        usage: TokenUsage::new(100, 0, 20),
        usage_by_model: Default::default(),
        cost_usd: 0.001,
        timing: Timing::between(now, now),
        model_attempts: 1,
        qa_status: QaStatus::Pending,
    }
}

/// T-3 returns an error, T-7 panics, T-5 needs review, everything else passes.
#[derive(Default)]
struct ScriptedEvaluator {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl TicketEvaluator for ScriptedEvaluator {
    async fn evaluate_ticket(
        &self,
        session_id: &str,
        ticket: &TicketInput,
    ) -> Result<TicketEvaluation, EvaluationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match ticket.ticket_id.as_str() {
            "T-3" => Err(EvaluationError::Extraction {
                message: "store offline".to_string(),
            }),
            "T-7" => panic!("boom in T-7"),
            "T-5" => Ok(evaluation(session_id, &ticket.ticket_id, OverallStatus::NeedsReview)),
            id => Ok(evaluation(session_id, id, OverallStatus::Pass)),
        }
    }
}

#[tokio::test]
async fn test_failing_items_do_not_stop_the_batch() {
    let evaluator = Arc::new(ScriptedEvaluator::default());
    let orchestrator = BatchOrchestrator::new(evaluator.clone());

    let summary = orchestrator.run("session-1", &tickets(10)).await;

    assert_eq!(summary.counters.completed, 8);
    assert_eq!(summary.counters.failed, 2);
    assert_eq!(summary.counters.pass, 7);
    assert_eq!(summary.counters.needs_review, 1);
    assert_eq!(summary.counters.percent, 100.0);
    assert_eq!(summary.evaluation_ids.len(), 8);

    let failed: Vec<&str> = summary.errors.iter().map(|e| e.ticket_id.as_str()).collect();
    assert_eq!(failed, vec!["T-3", "T-7"]);
    assert!(summary.errors[1].message.contains("boom in T-7"));
}

#[tokio::test]
async fn test_window_bounds_concurrency() {
    let evaluator = Arc::new(ScriptedEvaluator::default());
    let orchestrator = BatchOrchestrator::new(evaluator.clone()).with_window_size(3);

    orchestrator.run("session-1", &tickets(10)).await;

    let max = evaluator.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "saw {max} concurrent evaluations");
    assert!(max >= 2);
}

#[tokio::test]
async fn test_progress_events_bracket_each_window() {
    let orchestrator = BatchOrchestrator::new(Arc::new(ScriptedEvaluator::default()));
    let mut rx = orchestrator.subscribe();

    orchestrator.run("session-9", &tickets(10)).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.session_id == "session-9"));
    assert_eq!(
        events[0].phase,
        BatchPhase::Started {
            total: 10,
            window_size: 3
        }
    );
    assert_eq!(
        events[1].phase,
        BatchPhase::WindowCompleted {
            window: 1,
            windows: 4
        }
    );
    assert_eq!(events[1].counters.processed(), 3);
    assert!((events[1].counters.percent - 30.0).abs() < 1e-9);
    assert!(matches!(events[5].phase, BatchPhase::Completed { .. }));
    assert_eq!(events[5].counters.completed, 8);
    assert_eq!(events[5].counters.failed, 2);
    assert_eq!(events[5].counters.total_tokens(), 8 * 120);
}

#[tokio::test]
async fn test_progress_stream_yields_events() {
    let orchestrator = BatchOrchestrator::new(Arc::new(ScriptedEvaluator::default()));
    let stream = orchestrator.progress_stream();

    orchestrator.run("session-2", &tickets(2)).await;
    drop(orchestrator);

    let events: Vec<ProgressEvent> = stream.collect().await;
    assert_eq!(events.len(), 3);
    assert!(matches!(events.last().unwrap().phase, BatchPhase::Completed { .. }));
}

#[tokio::test]
async fn test_empty_batch_completes_immediately() {
    let orchestrator = BatchOrchestrator::new(Arc::new(ScriptedEvaluator::default()));

    let summary = orchestrator.run("session-0", &[]).await;

    assert_eq!(summary.counters.total, 0);
    assert_eq!(summary.counters.percent, 100.0);
    assert!(summary.errors.is_empty());
}

#[test]
fn test_zero_window_is_clamped() {
    let orchestrator = BatchOrchestrator::new(Arc::new(ScriptedEvaluator::default())).with_window_size(0);
    assert_eq!(orchestrator.window_size(), 1);
}

#[test]
fn test_progress_event_serializes_phase_inline() {
    let event = ProgressEvent {
        session_id: "s".to_string(),
        phase: BatchPhase::Completed { duration_ms: 12 },
        counters: BatchCounters::new(1),
        emitted_at: Utc::now(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["phase"], "completed");
    assert_eq!(json["duration_ms"], 12);
}
