use crate::domain::{Finding, FindingType, OverallStatus, Severity};

/// Final status from the model's report and the reconciled findings.
///
/// - any critical violation, or more than one high violation: `fail`
/// - otherwise any potential violation while no critical/high violation exists: `needs_review`
/// - otherwise the reported status, `pass` when none was reported
pub fn determine_status(reported: Option<OverallStatus>, findings: &[Finding]) -> OverallStatus {
    let critical = findings
        .iter()
        .filter(|f| f.is_violation_of(Severity::Critical))
        .count();
    let high = findings
        .iter()
        .filter(|f| f.is_violation_of(Severity::High))
        .count();

    if critical > 0 || high > 1 {
        return OverallStatus::Fail;
    }

    let potential = findings
        .iter()
        .any(|f| f.finding_type == FindingType::PotentialViolation);
    if potential && high == 0 {
        return OverallStatus::NeedsReview;
    }

    reported.unwrap_or_default()
}
