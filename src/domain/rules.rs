use serde::{Deserialize, Serialize};

use super::finding::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Certainty {
    #[default]
    Hard,
    Soft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    #[serde(rename = "if")]
    pub when: String,
    pub then: String,
    #[serde(default)]
    pub certainty: Certainty,
}

/// An authoritative compliance rule as written by rule authors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub remediation_steps: Vec<String>,
    #[serde(default)]
    pub allowed_actions: Vec<String>,
    #[serde(default)]
    pub disallowed_actions: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub example_good: Option<String>,
    #[serde(default)]
    pub example_bad: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub default_severity: Severity,
    #[serde(default)]
    pub evidence_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub source_location: Option<String>,
}

/// A retrieval-sized slice of a [`RuleDocument`] carrying its own embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChunk {
    pub chunk_id: String,
    pub rule_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleChunk {
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.metadata
            .tags
            .iter()
            .any(|t| tags.iter().any(|wanted| wanted.eq_ignore_ascii_case(t)))
    }

    pub fn matching_tags(&self, tags: &[String]) -> Vec<String> {
        self.metadata
            .tags
            .iter()
            .filter(|t| tags.iter().any(|wanted| wanted.eq_ignore_ascii_case(t)))
            .cloned()
            .collect()
    }
}
