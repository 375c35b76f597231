use std::sync::Arc;

use super::*;
use crate::corpus::{CorpusError, CorpusSnapshot, InMemoryCorpus};
use crate::domain::{ChunkMetadata, RuleDocument, Severity};
use crate::embedding::HashedEmbedder;

const DIM: usize = 256;

fn rule(id: &str) -> RuleDocument {
    RuleDocument {
        id: id.to_string(),
        title: id.to_string(),
        text: String::new(),
        category: None,
        remediation_steps: Vec::new(),
        allowed_actions: Vec::new(),
        disallowed_actions: Vec::new(),
        conditions: Vec::new(),
        exceptions: Vec::new(),
        example_good: None,
        example_bad: None,
        tags: Vec::new(),
        default_severity: Severity::Medium,
        evidence_requirements: Vec::new(),
    }
}

fn chunk(
    embedder: &HashedEmbedder,
    chunk_id: &str,
    rule_id: &str,
    text: &str,
    tags: &[&str],
    severity: Severity,
) -> RuleChunk {
    RuleChunk {
        chunk_id: chunk_id.to_string(),
        rule_id: rule_id.to_string(),
        text: text.to_string(),
        embedding: embedder.embed_text(text),
        metadata: ChunkMetadata {
            category: "payments".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            severity,
            ..Default::default()
        },
        token_count: 100,
        active: true,
    }
}

fn retriever(chunks: Vec<RuleChunk>, config: RetrievalConfig) -> HybridRetriever<InMemoryCorpus, HashedEmbedder> {
    let mut rule_ids: Vec<String> = chunks.iter().map(|c| c.rule_id.clone()).collect();
    rule_ids.dedup();
    let corpus = InMemoryCorpus::from_snapshot(CorpusSnapshot {
        rules: rule_ids.iter().map(|id| rule(id)).collect(),
        chunks,
    })
    .unwrap();
    HybridRetriever::new(
        Arc::new(corpus),
        Arc::new(HashedEmbedder::new(DIM).unwrap()),
        config,
    )
}

fn classification(tags: &[&str]) -> Classification {
    Classification {
        category: "payments".to_string(),
        subcategory: "withdrawal".to_string(),
        mandatory_tags: tags.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }
}

const SUMMARY: &str = "customer withdrawal pending verification delay";

async fn run(retriever: &HybridRetriever<InMemoryCorpus, HashedEmbedder>, tags: &[&str]) -> RetrievalResult {
    let facts = TicketFacts::default();
    let actions = AgentActions::default();
    let classification = classification(tags);
    retriever
        .retrieve(&RetrievalQuery {
            summary: SUMMARY,
            entities: &[],
            facts: &facts,
            actions: &actions,
            classification: &classification,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_tag_channel_includes_rule_below_similarity_floor() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let retriever = retriever(
        vec![
            chunk(&embedder, "PAY-1#0", "PAY-1", SUMMARY, &[], Severity::High),
            chunk(&embedder, "RG-9#0", "RG-9", "zebra quantum lighthouse", &["jurisdiction_gb"], Severity::Critical),
        ],
        RetrievalConfig {
            similarity_floor: 0.9,
            ..Default::default()
        },
    );

    let result = run(&retriever, &["jurisdiction_gb"]).await;

    let tagged = result
        .rules
        .iter()
        .find(|r| r.rule_id == "RG-9")
        .expect("mandatory rule must be present");
    assert_eq!(tagged.source, RetrievalSource::MandatoryTag);
    assert_eq!(tagged.similarity, 0.5);
    assert_eq!(tagged.matched_tags, vec!["jurisdiction_gb".to_string()]);
    assert_eq!(result.stats.tag_only, 1);
}

#[tokio::test]
async fn test_without_tag_low_similarity_rule_is_dropped() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let retriever = retriever(
        vec![
            chunk(&embedder, "PAY-1#0", "PAY-1", SUMMARY, &[], Severity::High),
            chunk(&embedder, "RG-9#0", "RG-9", "zebra quantum lighthouse", &["jurisdiction_gb"], Severity::Critical),
        ],
        RetrievalConfig {
            similarity_floor: 0.9,
            ..Default::default()
        },
    );

    let result = run(&retriever, &[]).await;

    assert!(result.rules.iter().all(|r| r.rule_id != "RG-9"));
    assert!(result.stats.below_floor >= 1);
}

#[tokio::test]
async fn test_semantic_hit_wins_over_tag_hit_for_same_rule() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let retriever = retriever(
        vec![chunk(&embedder, "PAY-1#0", "PAY-1", SUMMARY, &["withdrawal"], Severity::High)],
        RetrievalConfig {
            similarity_floor: 0.0,
            ..Default::default()
        },
    );

    let result = run(&retriever, &["withdrawal"]).await;

    assert_eq!(result.rules.len(), 1);
    assert_eq!(result.rules[0].source, RetrievalSource::Semantic);
    assert!(result.rules[0].similarity > 0.5);
    assert_eq!(result.rules[0].matched_tags, vec!["withdrawal".to_string()]);
    assert_eq!(result.stats.tag_only, 0);
}

#[tokio::test]
async fn test_merge_keeps_one_entry_per_rule() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let retriever = retriever(
        vec![
            chunk(&embedder, "PAY-1#0", "PAY-1", SUMMARY, &[], Severity::High),
            chunk(&embedder, "PAY-1#1", "PAY-1", "customer withdrawal pending", &[], Severity::High),
        ],
        RetrievalConfig {
            similarity_floor: -1.0,
            ..Default::default()
        },
    );

    let result = run(&retriever, &[]).await;

    assert_eq!(result.rules.len(), 1);
    assert_eq!(result.rules[0].chunk_id, "PAY-1#0");
}

#[tokio::test]
async fn test_result_cap_and_token_stats() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let chunks = (0..6)
        .map(|i| {
            chunk(
                &embedder,
                &format!("R-{i}#0"),
                &format!("R-{i}"),
                "tagged rule text",
                &["kyc"],
                Severity::Medium,
            )
        })
        .collect();
    let retriever = retriever(
        chunks,
        RetrievalConfig {
            similarity_floor: 0.99,
            max_results: 4,
            token_budget: 300,
            ..Default::default()
        },
    );

    let result = run(&retriever, &["kyc"]).await;

    assert_eq!(result.rules.len(), 4);
    assert_eq!(result.stats.truncated, 2);
    assert_eq!(result.stats.total_tokens, 400);
    assert!(result.stats.over_budget);
}

#[tokio::test]
async fn test_broad_tag_does_not_crowd_out_narrow_mandatory_tag() {
    let embedder = HashedEmbedder::new(DIM).unwrap();
    let mut chunks: Vec<RuleChunk> = (0..12)
        .map(|i| {
            chunk(
                &embedder,
                &format!("PAYG-{i}#0"),
                &format!("PAYG-{i}"),
                "general payments guidance",
                &["payments"],
                Severity::Medium,
            )
        })
        .collect();
    chunks.push(chunk(
        &embedder,
        "UK-1#0",
        "UK-1",
        "gambling commission licence conditions",
        &["jurisdiction_gb"],
        Severity::Critical,
    ));
    let retriever = retriever(
        chunks,
        RetrievalConfig {
            similarity_floor: 0.99,
            max_results: 50,
            ..Default::default()
        },
    );

    let result = run(&retriever, &["payments", "jurisdiction_gb"]).await;

    let uk = result
        .rules
        .iter()
        .find(|r| r.rule_id == "UK-1")
        .expect("jurisdiction rule must be retrieved");
    assert_eq!(uk.source, RetrievalSource::MandatoryTag);
    assert_eq!(uk.matched_tags, vec!["jurisdiction_gb".to_string()]);
    assert_eq!(result.stats.tag_candidates, 11);
}

#[tokio::test]
async fn test_corpus_width_mismatch_is_an_error() {
    let corpus_embedder = HashedEmbedder::new(DIM).unwrap();
    let corpus = InMemoryCorpus::from_snapshot(CorpusSnapshot {
        rules: vec![rule("PAY-1")],
        chunks: vec![chunk(&corpus_embedder, "PAY-1#0", "PAY-1", SUMMARY, &[], Severity::High)],
    })
    .unwrap();
    let retriever = HybridRetriever::new(
        Arc::new(corpus),
        Arc::new(HashedEmbedder::new(384).unwrap()),
        RetrievalConfig::default(),
    );

    let facts = TicketFacts::default();
    let actions = AgentActions::default();
    let classification = classification(&[]);
    let err = retriever
        .retrieve(&RetrievalQuery {
            summary: SUMMARY,
            entities: &[],
            facts: &facts,
            actions: &actions,
            classification: &classification,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RetrievalError::Corpus(CorpusError::InvalidDimension {
            expected: 256,
            actual: 384
        })
    ));
}

fn retrieved(rule_id: &str, source: RetrievalSource, similarity: f32, severity: Severity) -> RetrievedRule {
    RetrievedRule {
        rule_id: rule_id.to_string(),
        chunk_id: format!("{rule_id}#0"),
        text: String::new(),
        similarity,
        source,
        severity,
        category: String::new(),
        tags: Vec::new(),
        matched_tags: Vec::new(),
        token_count: 0,
    }
}

#[test]
fn test_rank_order() {
    let mut rules = vec![
        retrieved("tag-critical", RetrievalSource::MandatoryTag, 0.5, Severity::Critical),
        retrieved("sem-low", RetrievalSource::Semantic, 0.4, Severity::Low),
        retrieved("sem-high-sev", RetrievalSource::Semantic, 0.8, Severity::High),
        retrieved("sem-low-sev", RetrievalSource::Semantic, 0.8, Severity::Low),
    ];

    rules.sort_by(rank_order);

    let order: Vec<_> = rules.iter().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(order, vec!["sem-high-sev", "sem-low-sev", "sem-low", "tag-critical"]);
}
