use super::*;

fn finding(finding_type: FindingType, severity: Severity) -> Finding {
    Finding {
        finding_type,
        severity,
        rule: RuleReference {
            rule_id: "RG-001".to_string(),
            title: "Responsible gambling".to_string(),
            excerpt: None,
        },
        explanation: "test".to_string(),
        recommended_fix: None,
        evidence: Vec::new(),
        verification: None,
        source: FindingSource::Model,
    }
}

fn seeded_findings(seed: u64, len: usize) -> Vec<Finding> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let t = FindingType::ALL[(state >> 33) as usize % FindingType::ALL.len()];
            let s = Severity::ALL[(state >> 17) as usize % Severity::ALL.len()];
            finding(t, s)
        })
        .collect()
}

#[test]
fn test_summary_matches_filtered_counts_for_seeded_lists() {
    for seed in 0..200u64 {
        let findings = seeded_findings(seed, (seed % 17) as usize);
        let set = FindingSet::new(findings.clone());
        let summary = set.summary();

        assert_eq!(summary.total, findings.len());
        for t in FindingType::ALL {
            let expected = findings.iter().filter(|f| f.finding_type == t).count();
            assert_eq!(summary.count_type(t), expected, "seed {seed} type {t}");
        }
        for s in Severity::ALL {
            let expected = findings.iter().filter(|f| f.severity == s).count();
            assert_eq!(summary.count_severity(s), expected, "seed {seed} severity {s}");
        }
    }
}

#[test]
fn test_finding_set_deserialization_recomputes_summary() {
    let set = FindingSet::new(vec![
        finding(FindingType::Violation, Severity::Critical),
        finding(FindingType::Positive, Severity::Low),
    ]);
    let mut json = serde_json::to_value(&set).unwrap();
    json["summary"]["violations"] = serde_json::json!(42);
    json["summary"]["total"] = serde_json::json!(0);

    let restored: FindingSet = serde_json::from_value(json).unwrap();

    assert_eq!(restored.summary().violations, 1);
    assert_eq!(restored.summary().total, 2);
    assert_eq!(restored, set);
}

#[test]
fn test_normalize_speaker_agent_labels() {
    assert_eq!(normalize_speaker(Some("Jane from Stake.com")), Speaker::Agent);
    assert_eq!(normalize_speaker(Some("Support Agent")), Speaker::Agent);
    assert_eq!(normalize_speaker(Some("support bot")), Speaker::Agent);
}

#[test]
fn test_normalize_speaker_system_and_user_labels() {
    assert_eq!(normalize_speaker(Some("System")), Speaker::System);
    assert_eq!(normalize_speaker(Some("Automated message")), Speaker::System);
    assert_eq!(normalize_speaker(Some("ote02")), Speaker::User);
    assert_eq!(normalize_speaker(Some("")), Speaker::User);
    assert_eq!(normalize_speaker(Some("   ")), Speaker::User);
    assert_eq!(normalize_speaker(None), Speaker::User);
}

#[test]
fn test_parse_lenient_enums() {
    assert_eq!(FindingType::parse("Potential_Violation"), Some(FindingType::PotentialViolation));
    assert_eq!(FindingType::parse("warning"), None);
    assert_eq!(Severity::parse(" HIGH "), Some(Severity::High));
    assert_eq!(Severity::parse("severe"), None);
    assert_eq!(OverallStatus::parse("Needs Review"), Some(OverallStatus::NeedsReview));
    assert_eq!(OverallStatus::parse("needs-review"), Some(OverallStatus::NeedsReview));
    assert_eq!(OverallStatus::parse("maybe"), None);
}

#[test]
fn test_transcript_accepts_both_representations() {
    let messages: Transcript = serde_json::from_str(
        r#"[{"speaker": "ote02", "text": "hi"}, {"speaker": "Jane from Stake.com", "text": "hello"}]"#,
    )
    .unwrap();
    let merged: Transcript =
        serde_json::from_str(r#"{"full_conversation": "ote02: hi\nJane from Stake.com: hello"}"#)
            .unwrap();

    assert_eq!(messages.full_text(), merged.full_text());
    let speakers: Vec<_> = merged.utterances().iter().map(|u| u.speaker).collect();
    assert_eq!(speakers, vec![Speaker::User, Speaker::Agent]);
}

#[test]
fn test_pre_merged_single_message_is_treated_as_blob() {
    let transcript = Transcript::Messages(vec![Message::new(
        "Full Conversation",
        "Player: where is my withdrawal?\nSupport Agent: checking now",
    )]);

    let utterances = transcript.utterances();
    assert_eq!(utterances.len(), 2);
    assert_eq!(utterances[1].speaker, Speaker::Agent);
    assert_eq!(utterances[1].text, "checking now");
}

#[test]
fn test_merged_lines_with_timestamps_keep_speaker_labels() {
    let transcript = Transcript::merged(
        "[10:31] ote02: can I play from abroad?\n\
         [10:32] Jane from Stake.com: sure, use a vpn\n\
         2024-05-01 10:33:07 ote02: thanks\n\
         (10:34) 10:34 is fine",
    );

    let utterances = transcript.utterances();

    assert_eq!(utterances.len(), 4);
    assert_eq!(utterances[0].label, "ote02");
    assert_eq!(utterances[1].speaker, Speaker::Agent);
    assert_eq!(utterances[1].label, "Jane from Stake.com");
    assert_eq!(utterances[1].text, "sure, use a vpn");
    assert_eq!(utterances[2].speaker, Speaker::User);
    assert_eq!(utterances[2].text, "thanks");
    assert_eq!(utterances[3].speaker, Speaker::User);
}

#[test]
fn test_merged_continuation_lines_keep_speaker() {
    let transcript = Transcript::merged("Agent: first line\nsecond line\nuser1: reply");
    let utterances = transcript.utterances();

    assert_eq!(utterances.len(), 3);
    assert_eq!(utterances[1].speaker, Speaker::Agent);
    assert_eq!(utterances[1].text, "second line");
    assert_eq!(utterances[2].speaker, Speaker::User);
}

#[test]
fn test_ticket_facts_default_to_unknown() {
    let facts: TicketFacts =
        serde_json::from_str(r#"{"account_restriction_state": "self_excluded"}"#).unwrap();

    assert_eq!(facts.account_restriction_state, RestrictionState::SelfExcluded);
    assert_eq!(facts.has_password, Flag::Unknown);
    assert_eq!(facts.auth_method, AuthMethod::Unknown);
    assert_eq!(facts.region(), "unknown");
}

#[test]
fn test_ticket_facts_unrecognized_values_become_unknown() {
    let facts: TicketFacts = serde_json::from_str(
        r#"{"account_restriction_state": "frozen", "auth_method": "ldap", "kyc_verified": "maybe"}"#,
    )
    .unwrap();

    assert_eq!(facts.account_restriction_state, RestrictionState::Unknown);
    assert_eq!(facts.auth_method, AuthMethod::Unknown);
    assert_eq!(facts.kyc_verified, Flag::Unknown);
}

#[test]
fn test_lacks_password_from_auth_method() {
    let facts = TicketFacts {
        auth_method: AuthMethod::Google,
        ..Default::default()
    };
    assert!(facts.lacks_password());

    let facts = TicketFacts {
        auth_method: AuthMethod::Google,
        has_password: Flag::Yes,
        ..Default::default()
    };
    assert!(!facts.lacks_password());
}

#[test]
fn test_token_usage_regular_prompt_tokens() {
    let mut usage = TokenUsage::new(1000, 400, 200);
    usage.accumulate(&TokenUsage::new(10, 0, 5));

    assert_eq!(usage.regular_prompt_tokens(), 610);
    assert_eq!(usage.total(), 1215);
}
