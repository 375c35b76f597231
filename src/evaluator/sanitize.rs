//! Model output extraction and sanitization.
//!
//! Output must deserialize into [`RawAssessment`]; anything else is an extraction error
//! that feeds the retry loop. Once parsed, field values are coerced into the strict
//! domain types: unknown finding types become `note`, unknown severities `medium`, and
//! evidence speakers are normalized to user/agent/system.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::EvaluationError;
use crate::domain::{
    Evidence, Finding, FindingSource, FindingType, OverallStatus, RuleReference, Severity,
    Verification, normalize_speaker,
};

const UNSPECIFIED_RULE: &str = "UNSPECIFIED";
const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvidence {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFinding {
    #[serde(rename = "type", default)]
    pub finding_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub rule_title: Option<String>,
    #[serde(default)]
    pub rule_excerpt: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub recommended_fix: Option<String>,
    #[serde(default)]
    pub evidence: Vec<RawEvidence>,
    #[serde(default)]
    pub needs_verification: Option<bool>,
    #[serde(default)]
    pub what_to_verify: Option<String>,
    #[serde(default)]
    pub why_uncertain: Option<String>,
}

/// Shape the model is asked to return. `findings` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAssessment {
    #[serde(default)]
    pub overall_status: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub assessment: Option<String>,
    pub findings: Vec<RawFinding>,
}

/// Parsed and coerced model output.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedAssessment {
    /// `None` when the model reported no status or an unrecognized one.
    pub reported_status: Option<OverallStatus>,
    pub confidence: f32,
    pub assessment: Option<String>,
    pub findings: Vec<Finding>,
}

/// Strips a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_assessment(text: &str) -> Result<RawAssessment, EvaluationError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(EvaluationError::Extraction {
            message: "empty model output".to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| EvaluationError::Extraction {
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sanitize_finding(raw: RawFinding, titles: &HashMap<String, String>) -> Finding {
    let rule_id = non_empty(raw.rule_id).unwrap_or_else(|| UNSPECIFIED_RULE.to_string());
    let title = non_empty(raw.rule_title)
        .or_else(|| titles.get(&rule_id).cloned())
        .unwrap_or_else(|| rule_id.clone());

    let evidence = raw
        .evidence
        .into_iter()
        .filter_map(|e| {
            let text = non_empty(e.text)?;
            Some(Evidence {
                speaker: normalize_speaker(e.speaker.as_deref()),
                text,
                timestamp: non_empty(e.timestamp),
            })
        })
        .collect();

    let what_to_verify = non_empty(raw.what_to_verify);
    let verification = (raw.needs_verification.unwrap_or(false) || what_to_verify.is_some())
        .then(|| Verification {
            what_to_verify: what_to_verify.unwrap_or_default(),
            why_uncertain: non_empty(raw.why_uncertain).unwrap_or_default(),
        });

    Finding {
        finding_type: raw
            .finding_type
            .as_deref()
            .and_then(FindingType::parse)
            .unwrap_or(FindingType::Note),
        severity: raw
            .severity
            .as_deref()
            .and_then(Severity::parse)
            .unwrap_or(Severity::Medium),
        rule: RuleReference {
            rule_id,
            title,
            excerpt: non_empty(raw.rule_excerpt),
        },
        explanation: non_empty(raw.explanation).unwrap_or_default(),
        recommended_fix: non_empty(raw.recommended_fix),
        evidence,
        verification,
        source: FindingSource::Model,
    }
}

/// Coerces a parsed assessment. `titles` maps retrieved rule ids to their titles.
pub fn sanitize(raw: RawAssessment, titles: &HashMap<String, String>) -> SanitizedAssessment {
    let confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(DEFAULT_CONFIDENCE);

    SanitizedAssessment {
        reported_status: raw.overall_status.as_deref().and_then(OverallStatus::parse),
        confidence,
        assessment: non_empty(raw.assessment),
        findings: raw
            .findings
            .into_iter()
            .map(|f| sanitize_finding(f, titles))
            .collect(),
    }
}
