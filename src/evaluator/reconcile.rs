use crate::domain::Finding;

const EXPLANATION_PREFIX_CHARS: usize = 50;

fn explanation_key(finding: &Finding) -> String {
    finding
        .explanation
        .trim()
        .to_lowercase()
        .chars()
        .take(EXPLANATION_PREFIX_CHARS)
        .collect()
}

fn is_duplicate(guardrail: &Finding, model: &Finding) -> bool {
    guardrail.rule.rule_id.eq_ignore_ascii_case(&model.rule.rule_id)
        || (!guardrail.explanation.trim().is_empty()
            && explanation_key(guardrail) == explanation_key(model))
}

/// Merges guardrail findings into the model's list.
///
/// Guardrail findings always survive and come first. A model finding that duplicates one
/// (same rule id, or same explanation prefix) is dropped in its favour.
pub fn reconcile(guardrail_findings: &[Finding], model_findings: Vec<Finding>) -> Vec<Finding> {
    let mut merged = guardrail_findings.to_vec();
    merged.extend(
        model_findings
            .into_iter()
            .filter(|m| !guardrail_findings.iter().any(|g| is_duplicate(g, m))),
    );
    merged
}
