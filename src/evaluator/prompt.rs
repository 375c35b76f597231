//! Evaluation prompt assembly.
//!
//! Each retry uses a smaller [`ShrinkLevel`]: less transcript, fewer and shorter rules.

use std::fmt::Write;

use crate::domain::{AgentActions, Classification, Finding, RetrievedRule, RuleDocument, TicketFacts};
use crate::llm::CompletionRequest;
use crate::text::{truncate_chars, truncate_with_marker};

pub const SYSTEM_PROMPT: &str = r#"You are a compliance QA reviewer for customer-support conversations.
Evaluate the agent's handling of the ticket strictly against the rules provided.
Only cite rules that appear in the RULES section. Quote evidence verbatim from the transcript.
Deterministic guardrail findings are already confirmed; do not contradict them.

Respond with a single JSON object and nothing else:
{
  "overall_status": "pass" | "fail" | "needs_review",
  "confidence": number between 0 and 1,
  "assessment": "one or two sentences",
  "findings": [
    {
      "type": "violation" | "potential_violation" | "improvement" | "note" | "positive",
      "severity": "critical" | "high" | "medium" | "low",
      "rule_id": "id from RULES",
      "rule_title": "title",
      "rule_excerpt": "short quote of the rule",
      "explanation": "why this applies",
      "recommended_fix": "what the agent should have done",
      "evidence": [{"speaker": "user" | "agent" | "system", "text": "verbatim quote"}],
      "needs_verification": true | false,
      "what_to_verify": "only when needs_verification",
      "why_uncertain": "only when needs_verification"
    }
  ]
}"#;

/// How aggressively a prompt is trimmed. Ordered from largest to smallest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShrinkLevel {
    Full,
    Reduced,
    Minimal,
}

impl ShrinkLevel {
    /// Level for a zero-based attempt number.
    pub fn for_attempt(attempt: u32) -> Self {
        match attempt {
            0 => ShrinkLevel::Full,
            1 => ShrinkLevel::Reduced,
            _ => ShrinkLevel::Minimal,
        }
    }

    fn transcript_chars(&self, budget: usize) -> usize {
        match self {
            ShrinkLevel::Full => budget,
            ShrinkLevel::Reduced => budget / 2,
            ShrinkLevel::Minimal => budget / 4,
        }
    }

    fn max_rules(&self, available: usize) -> usize {
        match self {
            ShrinkLevel::Full => available,
            ShrinkLevel::Reduced => available.min(8),
            ShrinkLevel::Minimal => available.min(4),
        }
    }

    fn rule_chars(&self) -> Option<usize> {
        match self {
            ShrinkLevel::Full => None,
            ShrinkLevel::Reduced => Some(600),
            ShrinkLevel::Minimal => Some(200),
        }
    }

    /// Full rule documents (remediation, disallowed actions) only at the first level.
    fn include_rule_details(&self) -> bool {
        matches!(self, ShrinkLevel::Full)
    }

    fn max_tokens(&self) -> u32 {
        match self {
            ShrinkLevel::Full => 2048,
            ShrinkLevel::Reduced => 1536,
            ShrinkLevel::Minimal => 1024,
        }
    }
}

/// Everything the prompt is built from.
pub struct PromptContext<'a> {
    pub ticket_id: &'a str,
    pub summary: &'a str,
    pub transcript: &'a str,
    pub classification: &'a Classification,
    pub facts: &'a TicketFacts,
    pub actions: &'a AgentActions,
    pub rules: &'a [RetrievedRule],
    pub documents: &'a [RuleDocument],
    pub guardrail_findings: &'a [Finding],
    pub transcript_char_budget: usize,
}

fn write_rule(out: &mut String, rule: &RetrievedRule, doc: Option<&RuleDocument>, level: ShrinkLevel) {
    let title = doc.map(|d| d.title.as_str()).unwrap_or(rule.rule_id.as_str());
    let _ = writeln!(
        out,
        "[{}] {} (severity: {}, source: {:?})",
        rule.rule_id, title, rule.severity, rule.source
    );
    match level.rule_chars() {
        Some(max) => {
            let _ = writeln!(out, "{}", truncate_chars(&rule.text, max));
        }
        None => {
            let _ = writeln!(out, "{}", rule.text);
        }
    }

    if level.include_rule_details()
        && let Some(doc) = doc
    {
        if !doc.disallowed_actions.is_empty() {
            let _ = writeln!(out, "Disallowed: {}", doc.disallowed_actions.join("; "));
        }
        if !doc.remediation_steps.is_empty() {
            let _ = writeln!(out, "Remediation: {}", doc.remediation_steps.join("; "));
        }
        for condition in &doc.conditions {
            let _ = writeln!(
                out,
                "If {} then {} ({:?})",
                condition.when, condition.then, condition.certainty
            );
        }
        if !doc.exceptions.is_empty() {
            let _ = writeln!(out, "Exceptions: {}", doc.exceptions.join("; "));
        }
    }
    out.push('\n');
}

pub fn build_prompt(ctx: &PromptContext<'_>, level: ShrinkLevel) -> CompletionRequest {
    let mut user = String::new();

    let _ = writeln!(user, "TICKET: {}", ctx.ticket_id);
    let _ = writeln!(
        user,
        "CATEGORY: {} / {} (risk: {})",
        ctx.classification.category,
        ctx.classification.subcategory,
        ctx.classification.risk_level.as_str()
    );
    let _ = writeln!(user, "SUMMARY: {}\n", ctx.summary);

    let facts = ctx.facts.describe();
    if !facts.is_empty() {
        let _ = writeln!(user, "ACCOUNT FACTS:\n{}\n", facts.join("\n"));
    }
    let actions = ctx.actions.describe();
    if !actions.is_empty() {
        let _ = writeln!(user, "AGENT ACTIONS:\n{}\n", actions.join("\n"));
    }

    if !ctx.guardrail_findings.is_empty() {
        user.push_str("CONFIRMED GUARDRAIL FINDINGS:\n");
        for f in ctx.guardrail_findings {
            let _ = writeln!(
                user,
                "- [{}] {} {}: {}",
                f.rule.rule_id, f.severity, f.finding_type, f.explanation
            );
        }
        user.push('\n');
    }

    user.push_str("RULES:\n");
    let max_rules = level.max_rules(ctx.rules.len());
    if max_rules == 0 {
        user.push_str("(no rules retrieved)\n\n");
    }
    for rule in ctx.rules.iter().take(max_rules) {
        let doc = ctx.documents.iter().find(|d| d.id == rule.rule_id);
        write_rule(&mut user, rule, doc, level);
    }

    let _ = writeln!(
        user,
        "TRANSCRIPT:\n{}",
        truncate_with_marker(ctx.transcript, level.transcript_chars(ctx.transcript_char_budget))
    );

    CompletionRequest::new(SYSTEM_PROMPT, user).with_max_tokens(level.max_tokens())
}
