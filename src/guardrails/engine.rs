use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use super::builtin;
use super::error::GuardrailError;
use crate::domain::{
    AgentActions, Evidence, Finding, FindingSource, FindingType, RuleReference, Severity, Speaker,
    TicketFacts, Transcript, Utterance,
};
use crate::text::truncate_chars;

const EVIDENCE_MAX_CHARS: usize = 280;

/// Everything a guardrail check may look at for one ticket.
pub struct GuardrailContext<'a> {
    pub facts: &'a TicketFacts,
    pub transcript: &'a Transcript,
    pub actions: &'a AgentActions,
    utterances: Vec<Utterance<'a>>,
}

impl<'a> GuardrailContext<'a> {
    pub fn new(facts: &'a TicketFacts, transcript: &'a Transcript, actions: &'a AgentActions) -> Self {
        Self {
            facts,
            transcript,
            actions,
            utterances: transcript.utterances(),
        }
    }

    pub fn utterances(&self) -> &[Utterance<'a>] {
        &self.utterances
    }

    /// First agent line containing any of `phrases` (case-insensitive).
    pub fn agent_line_with(&self, phrases: &[&str]) -> Option<&Utterance<'a>> {
        self.utterances.iter().find(|u| {
            u.speaker == Speaker::Agent && {
                let text = u.text.to_lowercase();
                phrases.iter().any(|p| text.contains(p))
            }
        })
    }

    /// Whether the agent applied a macro or tag containing `needle`.
    pub fn agent_used(&self, needle: &str) -> bool {
        self.actions
            .macros_used
            .iter()
            .chain(&self.actions.tags_applied)
            .any(|m| m.to_lowercase().contains(needle))
    }
}

type ApplyFn = fn(&TicketFacts) -> bool;
type CheckFn = fn(&Guardrail, &GuardrailContext<'_>) -> Result<Option<Finding>, GuardrailError>;

/// One registered compliance check.
#[derive(Clone, Copy)]
pub struct Guardrail {
    pub id: &'static str,
    pub title: &'static str,
    pub severity: Severity,
    pub applies: ApplyFn,
    pub check: CheckFn,
}

impl std::fmt::Debug for Guardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guardrail")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .finish()
    }
}

impl Guardrail {
    /// Builds the violation finding this guardrail reports, citing one agent line.
    pub fn violation(
        &self,
        explanation: impl Into<String>,
        recommended_fix: impl Into<String>,
        line: &Utterance<'_>,
    ) -> Finding {
        Finding {
            finding_type: FindingType::Violation,
            severity: self.severity,
            rule: RuleReference {
                rule_id: self.id.to_string(),
                title: self.title.to_string(),
                excerpt: None,
            },
            explanation: explanation.into(),
            recommended_fix: Some(recommended_fix.into()),
            evidence: vec![Evidence::new(
                line.speaker,
                truncate_chars(line.text, EVIDENCE_MAX_CHARS),
            )],
            verification: None,
            source: FindingSource::Guardrail,
        }
    }
}

/// Registry of guardrails, evaluated in registration order.
#[derive(Debug, Clone, Default)]
pub struct GuardrailEngine {
    guardrails: Vec<Guardrail>,
}

impl GuardrailEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine preloaded with [`builtin::defaults`].
    pub fn with_defaults() -> Self {
        Self {
            guardrails: builtin::defaults(),
        }
    }

    pub fn register(&mut self, guardrail: Guardrail) -> Result<(), GuardrailError> {
        if self.guardrails.iter().any(|g| g.id == guardrail.id) {
            return Err(GuardrailError::DuplicateId {
                id: guardrail.id.to_string(),
            });
        }
        self.guardrails.push(guardrail);
        Ok(())
    }

    pub fn guardrails(&self) -> &[Guardrail] {
        &self.guardrails
    }

    pub fn len(&self) -> usize {
        self.guardrails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    /// Guardrails whose preconditions hold for `facts`.
    ///
    /// A panicking precondition counts as "applies" so the check itself still runs.
    pub fn relevant_guardrails(&self, facts: &TicketFacts) -> Vec<&Guardrail> {
        self.guardrails
            .iter()
            .filter(|g| {
                catch_unwind(AssertUnwindSafe(|| (g.applies)(facts))).unwrap_or_else(|_| {
                    warn!(guardrail = g.id, "Guardrail precondition panicked");
                    true
                })
            })
            .collect()
    }

    /// Runs the relevant guardrails and returns every triggered finding.
    ///
    /// A failing or panicking check is logged and treated as not triggered.
    pub fn quick_check(
        &self,
        facts: &TicketFacts,
        transcript: &Transcript,
        actions: &AgentActions,
    ) -> Vec<Finding> {
        let relevant = self.relevant_guardrails(facts);
        let ctx = GuardrailContext::new(facts, transcript, actions);

        let mut findings = Vec::new();
        for guardrail in &relevant {
            match run_one(guardrail, &ctx) {
                Ok(Some(finding)) => {
                    debug!(guardrail = guardrail.id, severity = %finding.severity, "Guardrail triggered");
                    findings.push(finding);
                }
                Ok(None) => {}
                Err(e) => warn!(guardrail = guardrail.id, error = %e, "Guardrail check failed"),
            }
        }

        debug!(
            registered = self.guardrails.len(),
            relevant = relevant.len(),
            triggered = findings.len(),
            "Guardrail pass complete"
        );
        findings
    }
}

fn run_one(
    guardrail: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    catch_unwind(AssertUnwindSafe(|| (guardrail.check)(guardrail, ctx))).unwrap_or_else(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(GuardrailError::Panicked {
                guardrail_id: guardrail.id.to_string(),
                message,
            })
        },
    )
}
