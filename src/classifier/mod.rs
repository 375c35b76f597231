//! Deterministic ticket triage.
//!
//! Two declarative tables drive classification. [`KEYWORD_RULES`] is scanned in priority
//! order and the first category with a keyword hit wins. [`FACT_RULES`] contribute
//! mandatory tags and a risk floor from account facts regardless of wording.

mod tables;


pub use tables::{FACT_RULES, FactRule, KEYWORD_RULES, KeywordRule, Subcategory};

use tracing::debug;

use crate::domain::{Classification, TicketFacts};

pub const GENERAL_CATEGORY: &str = "general";

/// Lower-cases and collapses non-alphanumerics to single spaces, padded on both ends so
/// that `contains(" phrase ")` is a whole-word match.
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.contains(&normalize(phrase))
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
}

/// Assigns a category, risk level and mandatory retrieval tags.
pub fn classify(summary: &str, facts: &TicketFacts) -> Classification {
    let text = normalize(summary);

    let mut category: Option<(&KeywordRule, &Subcategory)> = None;
    let mut matched_keywords = Vec::new();
    let mut mandatory_tags = Vec::new();

    for rule in KEYWORD_RULES {
        for sub in rule.subcategories {
            let hits: Vec<&str> = sub
                .keywords
                .iter()
                .copied()
                .filter(|k| contains_phrase(&text, k))
                .collect();
            if hits.is_empty() {
                continue;
            }
            if category.is_none() {
                category = Some((rule, sub));
            }
            for tag in rule.tags.iter().chain(sub.tags) {
                push_unique(&mut mandatory_tags, tag);
            }
            matched_keywords.extend(hits.into_iter().map(String::from));
        }
    }

    let mut risk = category.map(|(rule, _)| rule.risk).unwrap_or_default();
    let mut fact_category = None;
    for rule in FACT_RULES {
        if !(rule.applies)(facts) {
            continue;
        }
        for tag in rule.tags {
            push_unique(&mut mandatory_tags, tag);
        }
        if let Some(floor) = rule.risk {
            risk = risk.max(floor);
        }
        if fact_category.is_none() {
            fact_category = rule.category;
        }
    }

    if facts.regulated_region.is_yes() && facts.region() != "unknown" {
        push_unique(
            &mut mandatory_tags,
            &format!("jurisdiction_{}", facts.region().to_lowercase()),
        );
    }

    let (category, subcategory) = match (category, fact_category) {
        (Some((rule, sub)), _) => (rule.category, sub.name),
        (None, Some(from_facts)) => from_facts,
        (None, None) => (GENERAL_CATEGORY, GENERAL_CATEGORY),
    };

    matched_keywords.dedup();
    debug!(
        category,
        subcategory,
        risk = risk.as_str(),
        tags = mandatory_tags.len(),
        "Ticket classified"
    );

    Classification {
        category: category.to_string(),
        subcategory: subcategory.to_string(),
        risk_level: risk,
        mandatory_tags,
        matched_keywords,
    }
}
