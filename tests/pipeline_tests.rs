//! End-to-end evaluation of single tickets through the full pipeline.

mod common;

use std::sync::Arc;

use auditor::domain::{
    FindingSource, FindingType, OverallStatus, QaStatus, RetrievalSource, Speaker,
};
use auditor::evaluator::SYSTEM_RULE_ID;
use auditor::guardrails::builtin::SELF_EXCLUSION_PROMOTION;
use auditor::llm::{MockLanguageModel, RateTable};
use auditor::storage::{
    EvaluationQuery, EvaluationStore, FileEvaluationStore, MemoryEvaluationStore, SessionAggregate,
};

use common::fixtures::{
    CLEAN_PASS, POTENTIAL_VIOLATION, SESSION_ID, evaluator, ontario_ticket,
    self_excluded_bonus_ticket, withdrawal_ticket,
};

#[tokio::test]
async fn test_guardrail_violation_fails_ticket_despite_model_pass() {
    let store = Arc::new(MemoryEvaluationStore::new());
    let evaluator = evaluator(Arc::new(MockLanguageModel::with_response(CLEAN_PASS)), store.clone());

    let evaluation = evaluator
        .evaluate(SESSION_ID, &self_excluded_bonus_ticket("T-1"))
        .await
        .unwrap();

    assert_eq!(evaluation.overall_status, OverallStatus::Fail);
    let guardrail = &evaluation.findings()[0];
    assert_eq!(guardrail.rule.rule_id, SELF_EXCLUSION_PROMOTION);
    assert_eq!(guardrail.source, FindingSource::Guardrail);
    assert_eq!(guardrail.severity, auditor::Severity::Critical);
    assert!(
        evaluation
            .retrieved_rules
            .iter()
            .any(|r| r.rule_id == "RG-001")
    );

    let failed = store
        .query(
            &EvaluationQuery::new()
                .session(SESSION_ID)
                .agent("agent-jane")
                .status(OverallStatus::Fail),
        )
        .await
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, evaluation.id);
}

#[tokio::test]
async fn test_mandatory_jurisdiction_rule_is_always_retrieved() {
    let store = Arc::new(MemoryEvaluationStore::new());
    let evaluator = evaluator(Arc::new(MockLanguageModel::with_response(CLEAN_PASS)), store);

    let evaluation = evaluator
        .evaluate(SESSION_ID, &ontario_ticket("T-2"))
        .await
        .unwrap();

    assert!(
        evaluation
            .classification
            .mandatory_tags
            .contains(&"jurisdiction_ontario".to_string())
    );
    let rule = evaluation
        .retrieved_rules
        .iter()
        .find(|r| r.rule_id == "JUR-ON-001")
        .expect("jurisdiction rule retrieved");
    if rule.source == RetrievalSource::MandatoryTag {
        assert_eq!(rule.matched_tags, vec!["jurisdiction_ontario".to_string()]);
    }
}

#[tokio::test]
async fn test_potential_violation_needs_review_and_speakers_are_normalized() {
    let store = Arc::new(MemoryEvaluationStore::new());
    let evaluator = evaluator(
        Arc::new(MockLanguageModel::with_response(POTENTIAL_VIOLATION)),
        store,
    );

    let evaluation = evaluator
        .evaluate(SESSION_ID, &withdrawal_ticket("T-3"))
        .await
        .unwrap();

    assert_eq!(evaluation.overall_status, OverallStatus::NeedsReview);
    let finding = &evaluation.findings()[0];
    assert_eq!(finding.finding_type, FindingType::PotentialViolation);
    assert_eq!(finding.rule.title, "No payout promises before verification");
    assert_eq!(finding.evidence[0].speaker, Speaker::Agent);
    assert!(finding.needs_verification());
    assert_eq!(evaluation.findings_summary().potential_violations, 1);
    assert_eq!(evaluation.findings_summary().needs_verification, 1);
}

#[tokio::test]
async fn test_total_model_outage_still_yields_a_record() {
    let store = Arc::new(MemoryEvaluationStore::new());
    let model = Arc::new(MockLanguageModel::failing());
    let evaluator = evaluator(model.clone(), store.clone());

    let evaluation = evaluator
        .evaluate(SESSION_ID, &withdrawal_ticket("T-4"))
        .await
        .unwrap();

    assert_eq!(evaluation.overall_status, OverallStatus::NeedsReview);
    assert_eq!(model.call_count(), 3);
    assert!(
        evaluation
            .findings()
            .iter()
            .any(|f| f.rule.rule_id == SYSTEM_RULE_ID)
    );
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_file_store_round_trip_and_session_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileEvaluationStore::new(dir.path()));
    let evaluator = evaluator(Arc::new(MockLanguageModel::with_response(CLEAN_PASS)), store.clone());

    let first = evaluator
        .evaluate(SESSION_ID, &withdrawal_ticket("T-5"))
        .await
        .unwrap();
    evaluator
        .evaluate(SESSION_ID, &self_excluded_bonus_ticket("T-6"))
        .await
        .unwrap();

    let updated = store
        .update_qa_status(first.id, QaStatus::Approved)
        .await
        .unwrap();
    assert_eq!(updated.qa_status, QaStatus::Approved);
    assert_eq!(updated.overall_status, first.overall_status);

    let reopened = FileEvaluationStore::new(dir.path());
    let records = reopened
        .query(&EvaluationQuery::new().session(SESSION_ID))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);

    let approved = reopened
        .query(&EvaluationQuery::new().qa_status(QaStatus::Approved))
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);

    let rates = RateTable::default();
    let aggregate = SessionAggregate::from_evaluations(&records, &rates);
    assert_eq!(aggregate.evaluations, 2);
    assert_eq!(aggregate.pass, 1);
    assert_eq!(aggregate.fail, 1);
    let inline: f64 = records.iter().map(|r| r.cost_usd).sum();
    assert!((aggregate.cost_usd - inline).abs() < 1e-12);
}

#[tokio::test]
async fn test_reevaluation_deletes_then_recreates() {
    let store = Arc::new(MemoryEvaluationStore::new());
    let evaluator = evaluator(Arc::new(MockLanguageModel::with_response(CLEAN_PASS)), store.clone());
    let ticket = withdrawal_ticket("T-7");

    let original = evaluator.evaluate(SESSION_ID, &ticket).await.unwrap();
    let replacement = evaluator.reevaluate(SESSION_ID, &ticket).await.unwrap();

    assert_ne!(original.id, replacement.id);
    assert!(store.get(original.id).await.unwrap().is_none());
    assert_eq!(store.len(), 1);
}
