use serde::{Deserialize, Serialize};

/// Kind of observation a [`Finding`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    Violation,
    PotentialViolation,
    Improvement,
    Note,
    Positive,
}

impl FindingType {
    pub const ALL: [FindingType; 5] = [
        FindingType::Violation,
        FindingType::PotentialViolation,
        FindingType::Improvement,
        FindingType::Note,
        FindingType::Positive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingType::Violation => "violation",
            FindingType::PotentialViolation => "potential_violation",
            FindingType::Improvement => "improvement",
            FindingType::Note => "note",
            FindingType::Positive => "positive",
        }
    }

    /// Parses one of the five wire values; anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for FindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a finding or rule. Ordered so that `Critical` is the greatest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Numeric rank used by index-backed filters (`low = 1` .. `critical = 4`).
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who said an evidence excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    #[default]
    User,
    Agent,
    System,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Agent => "agent",
            Speaker::System => "system",
        }
    }
}

const AGENT_MARKERS: &[&str] = &[
    "agent",
    "support",
    "staff",
    "operator",
    "representative",
    "advisor",
    "team",
    "stake",
    " from ",
];

const SYSTEM_MARKERS: &[&str] = &["system", "bot", "automated", "auto-reply", "workflow"];

/// Maps a raw speaker label onto [`Speaker`].
///
/// Agent markers are checked before system markers; everything else, including empty
/// or missing labels, is the user.
pub fn normalize_speaker(raw: Option<&str>) -> Speaker {
    let Some(raw) = raw else {
        return Speaker::User;
    };
    let label = format!(" {} ", raw.trim().to_lowercase());
    if label.trim().is_empty() {
        return Speaker::User;
    }

    if AGENT_MARKERS.iter().any(|m| label.contains(m)) {
        Speaker::Agent
    } else if SYSTEM_MARKERS.iter().any(|m| label.contains(m)) {
        Speaker::System
    } else {
        Speaker::User
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Evidence {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReference {
    pub rule_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Attached to findings the model was not sure about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub what_to_verify: String,
    pub why_uncertain: String,
}

/// Where a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    Guardrail,
    Model,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub severity: Severity,
    pub rule: RuleReference,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_fix: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    pub source: FindingSource,
}

impl Finding {
    pub fn is_violation_of(&self, severity: Severity) -> bool {
        self.finding_type == FindingType::Violation && self.severity == severity
    }

    pub fn needs_verification(&self) -> bool {
        self.verification.is_some()
    }
}

/// Counts derived from a finding list. Only ever built by [`FindingsSummary::from_findings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub total: usize,
    pub violations: usize,
    pub potential_violations: usize,
    pub improvements: usize,
    pub notes: usize,
    pub positives: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub needs_verification: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self {
            total: findings.len(),
            ..Self::default()
        };

        for finding in findings {
            match finding.finding_type {
                FindingType::Violation => summary.violations += 1,
                FindingType::PotentialViolation => summary.potential_violations += 1,
                FindingType::Improvement => summary.improvements += 1,
                FindingType::Note => summary.notes += 1,
                FindingType::Positive => summary.positives += 1,
            }
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            if finding.needs_verification() {
                summary.needs_verification += 1;
            }
        }

        summary
    }

    pub fn count_type(&self, finding_type: FindingType) -> usize {
        match finding_type {
            FindingType::Violation => self.violations,
            FindingType::PotentialViolation => self.potential_violations,
            FindingType::Improvement => self.improvements,
            FindingType::Note => self.notes,
            FindingType::Positive => self.positives,
        }
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// A finding list paired with its summary.
///
/// The summary is recomputed on every construction, including deserialization, so a
/// stored record can never carry counts that disagree with its findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FindingSetRepr")]
pub struct FindingSet {
    items: Vec<Finding>,
    summary: FindingsSummary,
}

#[derive(Deserialize)]
struct FindingSetRepr {
    #[serde(default)]
    items: Vec<Finding>,
}

impl From<FindingSetRepr> for FindingSet {
    fn from(repr: FindingSetRepr) -> Self {
        Self::new(repr.items)
    }
}

impl FindingSet {
    pub fn new(items: Vec<Finding>) -> Self {
        let summary = FindingsSummary::from_findings(&items);
        Self { items, summary }
    }

    pub fn items(&self) -> &[Finding] {
        &self.items
    }

    pub fn summary(&self) -> &FindingsSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
