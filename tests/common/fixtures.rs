//! Test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use auditor::corpus::{CorpusSnapshot, InMemoryCorpus};
use auditor::domain::{
    ChunkMetadata, Flag, Message, RestrictionState, RuleChunk, RuleDocument, Severity,
    TicketFacts, TicketInput, Transcript,
};
use auditor::embedding::HashedEmbedder;
use auditor::evaluator::Evaluator;
use auditor::llm::MockLanguageModel;
use auditor::retrieval::{HybridRetriever, RetrievalConfig};
use auditor::storage::EvaluationStore;
use auditor::summarizer::Summarizer;

pub const EMBEDDING_DIM: usize = 256;

pub const SESSION_ID: &str = "session-2026-10";

pub const CLEAN_PASS: &str =
    r#"{"overall_status": "pass", "confidence": 0.92, "assessment": "Correct handling.", "findings": []}"#;

pub const POTENTIAL_VIOLATION: &str = r#"```json
{
  "overall_status": "pass",
  "confidence": 0.6,
  "assessment": "Withdrawal timing was promised before KYC completed.",
  "findings": [{
    "type": "potential_violation",
    "severity": "medium",
    "rule_id": "KYC-002",
    "explanation": "Agent gave a payout estimate while verification was pending.",
    "evidence": [{"speaker": "Jane from Stake.com", "text": "should arrive within 24 hours"}],
    "needs_verification": true,
    "what_to_verify": "KYC state at the time of the chat",
    "why_uncertain": "Facts snapshot may be stale"
  }]
}
```"#;

pub type TestEvaluator = Evaluator<InMemoryCorpus, HashedEmbedder>;

pub fn embedder() -> HashedEmbedder {
    HashedEmbedder::new(EMBEDDING_DIM).unwrap()
}

#[derive(Default)]
pub struct RuleBuilder {
    id: String,
    title: String,
    text: String,
    category: String,
    tags: Vec<String>,
    severity: Severity,
}

impl RuleBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: id.to_string(),
            category: "general".to_string(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// The rule document plus one chunk embedded with [`embedder`].
    pub fn build(self) -> (RuleDocument, RuleChunk) {
        let chunk = RuleChunk {
            chunk_id: format!("{}#0", self.id),
            rule_id: self.id.clone(),
            text: self.text.clone(),
            embedding: embedder().embed_text(&self.text),
            metadata: ChunkMetadata {
                category: self.category.clone(),
                tags: self.tags.clone(),
                severity: self.severity,
                ..Default::default()
            },
            token_count: (self.text.len() / 4) as u32,
            active: true,
        };
        let doc = RuleDocument {
            id: self.id,
            title: self.title,
            text: self.text,
            category: Some(self.category),
            remediation_steps: Vec::new(),
            allowed_actions: Vec::new(),
            disallowed_actions: Vec::new(),
            conditions: Vec::new(),
            exceptions: Vec::new(),
            example_good: None,
            example_bad: None,
            tags: self.tags,
            default_severity: self.severity,
            evidence_requirements: Vec::new(),
        };
        (doc, chunk)
    }
}

pub fn sample_snapshot() -> CorpusSnapshot {
    let rules = vec![
        RuleBuilder::new("RG-001")
            .title("No promotions during self-exclusion")
            .text("Never offer bonuses, promotions or free bets to a self-excluded customer.")
            .category("responsible_gambling")
            .tags(&["responsible_gambling", "self_exclusion"])
            .severity(Severity::Critical)
            .build(),
        RuleBuilder::new("KYC-002")
            .title("No payout promises before verification")
            .text("Do not promise withdrawal timing while identity verification is pending.")
            .category("payments")
            .tags(&["payments", "kyc", "withdrawal"])
            .severity(Severity::High)
            .build(),
        RuleBuilder::new("ACC-003")
            .title("Passwordless accounts")
            .text("Accounts that sign in with Google have no password; never send a password reset.")
            .category("account_access")
            .tags(&["account_access", "passwordless"])
            .severity(Severity::High)
            .build(),
        RuleBuilder::new("JUR-ON-001")
            .title("Ontario disclosures")
            .text("Provincial regulator notice text must accompany every limits conversation.")
            .category("regulatory")
            .tags(&["jurisdiction_ontario"])
            .severity(Severity::High)
            .build(),
    ];

    let (rules, chunks) = rules.into_iter().unzip();
    CorpusSnapshot { rules, chunks }
}

pub fn sample_corpus() -> InMemoryCorpus {
    InMemoryCorpus::from_snapshot(sample_snapshot()).unwrap()
}

/// Evaluator over [`sample_corpus`]. Summaries come from a separate canned model.
pub fn evaluator(model: Arc<MockLanguageModel>, store: Arc<dyn EvaluationStore>) -> TestEvaluator {
    let retriever = HybridRetriever::new(
        Arc::new(sample_corpus()),
        Arc::new(embedder()),
        RetrievalConfig::default(),
    );
    let summarizer = Summarizer::new(Arc::new(MockLanguageModel::with_response(
        "The customer asked about their withdrawal and the agent explained the next steps.",
    )));
    Evaluator::new(model, retriever, store).with_summarizer(summarizer)
}

pub fn conversation(lines: &[(&str, &str)]) -> Transcript {
    Transcript::Messages(
        lines
            .iter()
            .map(|(speaker, text)| Message::new(*speaker, *text))
            .collect(),
    )
}

pub fn withdrawal_ticket(id: &str) -> TicketInput {
    TicketInput::new(
        id,
        conversation(&[
            ("ote02", "When will my withdrawal arrive?"),
            ("Jane from Stake.com", "It should arrive within 24 hours."),
        ]),
    )
    .with_agent("agent-jane")
}

pub fn self_excluded_bonus_ticket(id: &str) -> TicketInput {
    TicketInput::new(
        id,
        conversation(&[
            ("ote02", "Hi, I can't log in."),
            (
                "Jane from Stake.com",
                "Your account is restricted, but we have a great deposit bonus this week!",
            ),
        ]),
    )
    .with_facts(TicketFacts {
        account_restriction_state: RestrictionState::SelfExcluded,
        ..Default::default()
    })
    .with_agent("agent-jane")
}

pub fn ontario_ticket(id: &str) -> TicketInput {
    TicketInput::new(
        id,
        Transcript::merged("Customer: can you raise my deposit limit?\nAgent: Sure, done."),
    )
    .with_facts(TicketFacts {
        region: "Ontario".to_string(),
        regulated_region: Flag::Yes,
        ..Default::default()
    })
}

pub fn batch_of(n: usize) -> Vec<TicketInput> {
    (1..=n).map(|i| withdrawal_ticket(&format!("T-{i}"))).collect()
}
