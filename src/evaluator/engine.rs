use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::EvaluationError;
use super::prompt::{PromptContext, ShrinkLevel, build_prompt};
use super::reconcile::reconcile;
use super::sanitize::{SanitizedAssessment, parse_assessment, sanitize};
use super::status::determine_status;
use crate::classifier::classify;
use crate::corpus::RuleCorpusStore;
use crate::domain::{
    Finding, FindingSet, FindingSource, FindingType, OverallStatus, QaStatus, RetrievedRule,
    RuleDocument, RuleReference, Severity, TicketEvaluation, TicketInput, Timing, TokenUsage,
    Verification,
};
use crate::embedding::Embedder;
use crate::guardrails::GuardrailEngine;
use crate::llm::{LanguageModel, RateTable};
use crate::retrieval::{HybridRetriever, RetrievalError, RetrievalQuery};
use crate::storage::EvaluationStore;
use crate::summarizer::{DEFAULT_CHAR_BUDGET, Summarizer};

pub const SYSTEM_RULE_ID: &str = "SYSTEM";
const FALLBACK_ASSESSMENT: &str = "Automated evaluation could not be completed; manual review required.";

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Retries after the first model attempt.
    pub max_retries: u32,
    /// Transcript characters sent on the first attempt. Retries send less.
    pub transcript_char_budget: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            transcript_char_budget: DEFAULT_CHAR_BUDGET,
        }
    }
}

/// Something that turns one ticket into one persisted evaluation.
///
/// The batch orchestrator depends on this rather than on [`Evaluator`] directly.
#[async_trait]
pub trait TicketEvaluator: Send + Sync {
    async fn evaluate_ticket(
        &self,
        session_id: &str,
        ticket: &TicketInput,
    ) -> Result<TicketEvaluation, EvaluationError>;
}

/// Why the model stage produced no assessment.
enum ModelOutcome {
    Assessed(SanitizedAssessment),
    Exhausted(String),
}

struct ModelRun {
    outcome: ModelOutcome,
    usage: TokenUsage,
    attempts: u32,
}

/// Runs the full per-ticket pipeline and persists the result.
pub struct Evaluator<S, E> {
    summarizer: Summarizer,
    model: Arc<dyn LanguageModel>,
    guardrails: GuardrailEngine,
    retriever: HybridRetriever<S, E>,
    store: Arc<dyn EvaluationStore>,
    rates: RateTable,
    config: EvaluatorConfig,
}

impl<S: RuleCorpusStore, E: Embedder> Evaluator<S, E> {
    /// Summaries use the same model as evaluation; override with [`Self::with_summarizer`].
    pub fn new(
        model: Arc<dyn LanguageModel>,
        retriever: HybridRetriever<S, E>,
        store: Arc<dyn EvaluationStore>,
    ) -> Self {
        Self {
            summarizer: Summarizer::new(model.clone()),
            model,
            guardrails: GuardrailEngine::with_defaults(),
            retriever,
            store,
            rates: RateTable::default(),
            config: EvaluatorConfig::default(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailEngine) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn EvaluationStore> {
        &self.store
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluates one ticket and stores the record.
    ///
    /// Model and retrieval failures do not surface as errors: they produce a
    /// `needs_review` record carrying a `SYSTEM` note. Only persistence can fail.
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.ticket_id))]
    pub async fn evaluate(
        &self,
        session_id: &str,
        ticket: &TicketInput,
    ) -> Result<TicketEvaluation, EvaluationError> {
        let started_at = Utc::now();

        debug!(stage = "summarizing", "Evaluation stage");
        let summary = self.summarizer.summarize(&ticket.transcript).await;
        let summary_usage = summary.usage;

        debug!(stage = "classifying", "Evaluation stage");
        let classification = classify(&summary.text, &ticket.facts);

        debug!(stage = "guardrail_checking", "Evaluation stage");
        let guardrail_findings =
            self.guardrails
                .quick_check(&ticket.facts, &ticket.transcript, &ticket.actions);

        debug!(stage = "retrieving", "Evaluation stage");
        let query = RetrievalQuery {
            summary: &summary.text,
            entities: &ticket.entities,
            facts: &ticket.facts,
            actions: &ticket.actions,
            classification: &classification,
        };
        let retrieved = self
            .retrieve_with_documents(&query)
            .await
            .map_err(|e| {
                warn!(error = %e, "Rule retrieval failed, falling back to manual review");
                format!("rule retrieval failed: {e}")
            });

        let (rules, run) = match retrieved {
            Ok((rules, documents)) => {
                let transcript = ticket.transcript.full_text();
                let ctx = PromptContext {
                    ticket_id: &ticket.ticket_id,
                    summary: &summary.text,
                    transcript: &transcript,
                    classification: &classification,
                    facts: &ticket.facts,
                    actions: &ticket.actions,
                    rules: &rules,
                    documents: &documents,
                    guardrail_findings: &guardrail_findings,
                    transcript_char_budget: self.config.transcript_char_budget,
                };
                let run = self.call_model(&ctx, &documents).await;
                (rules, run)
            }
            Err(reason) => (
                Vec::new(),
                ModelRun {
                    outcome: ModelOutcome::Exhausted(reason),
                    usage: TokenUsage::default(),
                    attempts: 0,
                },
            ),
        };
        let mut usage = summary_usage;
        usage.accumulate(&run.usage);

        debug!(stage = "reconciling", "Evaluation stage");
        let (reported, confidence, assessment, findings) = match run.outcome {
            ModelOutcome::Assessed(sanitized) => (
                sanitized.reported_status,
                sanitized.confidence,
                sanitized.assessment,
                reconcile(&guardrail_findings, sanitized.findings),
            ),
            ModelOutcome::Exhausted(reason) => {
                let mut findings = guardrail_findings.clone();
                findings.push(system_finding(&reason));
                (
                    Some(OverallStatus::NeedsReview),
                    0.0,
                    Some(FALLBACK_ASSESSMENT.to_string()),
                    findings,
                )
            }
        };
        let overall_status = determine_status(reported, &findings);

        let model = self.model.model_id().to_string();
        let mut usage_by_model: BTreeMap<String, TokenUsage> = BTreeMap::new();
        let shares = [
            (self.summarizer.model_id(), summary_usage),
            (model.as_str(), run.usage),
        ];
        for (spent_by, spent) in shares {
            usage_by_model
                .entry(spent_by.to_string())
                .or_default()
                .accumulate(&spent);
        }
        let cost_usd = self.rates.cost_by_model(&usage_by_model);

        let evaluation = TicketEvaluation {
            id: Uuid::new_v4(),
            ticket_id: ticket.ticket_id.clone(),
            session_id: session_id.to_string(),
            agent_id: ticket.agent_id.clone(),
            ticket_summary: summary.text,
            classification,
            overall_status,
            confidence,
            assessment,
            findings: FindingSet::new(findings),
            ticket_facts: ticket.facts.clone(),
            agent_actions: ticket.actions.clone(),
            retrieved_rules: rules,
            guardrail_findings,
            model,
            usage,
            usage_by_model,
            cost_usd,
            timing: Timing::between(started_at, Utc::now()),
            model_attempts: run.attempts,
            qa_status: QaStatus::Pending,
        };

        debug!(stage = "persisting", "Evaluation stage");
        self.store.insert(&evaluation).await?;

        info!(
            evaluation_id = %evaluation.id,
            status = %evaluation.overall_status,
            findings = evaluation.findings.len(),
            attempts = evaluation.model_attempts,
            tokens = evaluation.usage.total(),
            cost_usd = evaluation.cost_usd,
            duration_ms = evaluation.timing.duration_ms,
            "Ticket evaluated"
        );
        Ok(evaluation)
    }

    /// Deletes every stored record for the ticket, then evaluates it afresh.
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.ticket_id))]
    pub async fn reevaluate(
        &self,
        session_id: &str,
        ticket: &TicketInput,
    ) -> Result<TicketEvaluation, EvaluationError> {
        let removed = self.store.delete_for_ticket(&ticket.ticket_id).await?;
        debug!(removed, "Removed previous evaluations");
        self.evaluate(session_id, ticket).await
    }

    async fn retrieve_with_documents(
        &self,
        query: &RetrievalQuery<'_>,
    ) -> Result<(Vec<RetrievedRule>, Vec<RuleDocument>), RetrievalError> {
        let result = self.retriever.retrieve(query).await?;
        if result.stats.over_budget {
            debug!(
                total_tokens = result.stats.total_tokens,
                budget = result.stats.token_budget,
                "Retrieved rules exceed token budget"
            );
        }

        let mut documents = Vec::with_capacity(result.rules.len());
        for rule in &result.rules {
            if let Some(doc) = self.retriever.store().get_rule(&rule.rule_id).await? {
                documents.push(doc);
            }
        }
        Ok((result.rules, documents))
    }

    /// Calls the model up to `1 + max_retries` times, shrinking the prompt each time.
    async fn call_model(&self, ctx: &PromptContext<'_>, documents: &[RuleDocument]) -> ModelRun {
        let titles: HashMap<String, String> = documents
            .iter()
            .map(|d| (d.id.clone(), d.title.clone()))
            .collect();

        let mut usage = TokenUsage::default();
        let mut last_error = String::from("no model attempt was made");
        let max_attempts = self.config.max_retries + 1;

        for attempt in 0..max_attempts {
            let level = ShrinkLevel::for_attempt(attempt);
            debug!(stage = "model_calling", attempt, ?level, "Evaluation stage");

            let completion = match self.model.complete(build_prompt(ctx, level)).await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!(attempt, error = %e, "Model call failed");
                    last_error = e.to_string();
                    continue;
                }
            };
            usage.accumulate(&completion.usage);

            debug!(stage = "sanitizing", attempt, "Evaluation stage");
            match parse_assessment(&completion.text) {
                Ok(raw) => {
                    return ModelRun {
                        outcome: ModelOutcome::Assessed(sanitize(raw, &titles)),
                        usage,
                        attempts: attempt + 1,
                    };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Model output rejected");
                    last_error = e.to_string();
                }
            }
        }

        warn!(attempts = max_attempts, "Model attempts exhausted");
        ModelRun {
            outcome: ModelOutcome::Exhausted(last_error),
            usage,
            attempts: max_attempts,
        }
    }
}

#[async_trait]
impl<S: RuleCorpusStore, E: Embedder> TicketEvaluator for Evaluator<S, E> {
    async fn evaluate_ticket(
        &self,
        session_id: &str,
        ticket: &TicketInput,
    ) -> Result<TicketEvaluation, EvaluationError> {
        self.evaluate(session_id, ticket).await
    }
}

fn system_finding(reason: &str) -> Finding {
    Finding {
        finding_type: FindingType::Note,
        severity: Severity::Medium,
        rule: RuleReference {
            rule_id: SYSTEM_RULE_ID.to_string(),
            title: "Automated evaluation unavailable".to_string(),
            excerpt: None,
        },
        explanation: "Automated evaluation failed; manual review required.".to_string(),
        recommended_fix: None,
        evidence: Vec::new(),
        verification: Some(Verification {
            what_to_verify: "Review the full transcript against the applicable rules".to_string(),
            why_uncertain: reason.to_string(),
        }),
        source: FindingSource::System,
    }
}
