use super::builtin::{
    CREDENTIAL_REQUEST, GEO_CIRCUMVENTION, PASSWORD_RESET_WITHOUT_PASSWORD,
    SELF_EXCLUSION_PROMOTION, SELF_EXCLUSION_REVERSAL,
};
use super::*;
use crate::domain::{
    AgentActions, AuthMethod, Finding, FindingSource, FindingType, Flag, Message,
    RestrictionState, Severity, Speaker, TicketFacts, Transcript,
};

fn self_excluded() -> TicketFacts {
    TicketFacts {
        account_restriction_state: RestrictionState::SelfExcluded,
        ..Default::default()
    }
}

fn conversation(lines: &[(&str, &str)]) -> Transcript {
    Transcript::Messages(
        lines
            .iter()
            .map(|(speaker, text)| Message::new(*speaker, *text))
            .collect(),
    )
}

fn ids(guardrails: &[&Guardrail]) -> Vec<&'static str> {
    guardrails.iter().map(|g| g.id).collect()
}

#[test]
fn test_self_excluded_facts_select_self_exclusion_guardrails() {
    let engine = GuardrailEngine::with_defaults();
    let relevant = ids(&engine.relevant_guardrails(&self_excluded()));

    assert!(relevant.contains(&SELF_EXCLUSION_PROMOTION));
    assert!(relevant.contains(&SELF_EXCLUSION_REVERSAL));
    assert!(!relevant.contains(&PASSWORD_RESET_WITHOUT_PASSWORD));
}

#[test]
fn test_unrestricted_facts_only_select_universal_guardrails() {
    let engine = GuardrailEngine::with_defaults();
    let relevant = ids(&engine.relevant_guardrails(&TicketFacts::default()));

    assert_eq!(relevant, vec![GEO_CIRCUMVENTION, CREDENTIAL_REQUEST]);
}

#[test]
fn test_bonus_offer_to_self_excluded_account_is_one_critical_violation() {
    let engine = GuardrailEngine::with_defaults();
    let transcript = conversation(&[
        ("ote02", "Hi, I can't log in to my account."),
        (
            "Jane from Stake.com",
            "I see your account is restricted, but we have a great deposit bonus this week!",
        ),
    ]);

    let findings = engine.quick_check(&self_excluded(), &transcript, &AgentActions::default());

    assert_eq!(findings.len(), 1);
    let finding = &findings[0];
    assert_eq!(finding.finding_type, FindingType::Violation);
    assert_eq!(finding.severity, Severity::Critical);
    assert_eq!(finding.rule.rule_id, SELF_EXCLUSION_PROMOTION);
    assert_eq!(finding.source, FindingSource::Guardrail);
    assert_eq!(finding.evidence[0].speaker, Speaker::Agent);
}

#[test]
fn test_customer_mentioning_bonus_does_not_trigger() {
    let engine = GuardrailEngine::with_defaults();
    let transcript = conversation(&[
        ("ote02", "Can I still get my bonus?"),
        ("Support Agent", "Your account is self-excluded, so I can't help with that."),
    ]);

    let findings = engine.quick_check(&self_excluded(), &transcript, &AgentActions::default());
    assert!(findings.is_empty());
}

#[test]
fn test_password_reset_on_social_login_account() {
    let engine = GuardrailEngine::with_defaults();
    let facts = TicketFacts {
        auth_method: AuthMethod::Google,
        ..Default::default()
    };
    let transcript = Transcript::merged(
        "Player: I can't get in\nSupport Agent: Please use the reset link we emailed to reset your password.",
    );

    let findings = engine.quick_check(&facts, &transcript, &AgentActions::default());

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule.rule_id, PASSWORD_RESET_WITHOUT_PASSWORD);
    assert_eq!(findings[0].severity, Severity::High);
}

#[test]
fn test_password_reset_macro_triggers_without_phrase() {
    let engine = GuardrailEngine::with_defaults();
    let facts = TicketFacts {
        has_password: Flag::No,
        ..Default::default()
    };
    let transcript = conversation(&[("Agent", "Sending you the instructions now.")]);
    let actions = AgentActions {
        macros_used: vec!["Password Reset - Standard".to_string()],
        ..Default::default()
    };

    let findings = engine.quick_check(&facts, &transcript, &actions);
    assert_eq!(findings.len(), 1);
}

#[test]
fn test_credential_request_always_applies() {
    let engine = GuardrailEngine::with_defaults();
    let transcript = conversation(&[("Support", "To verify you, please share your password.")]);

    let findings = engine.quick_check(&TicketFacts::default(), &transcript, &AgentActions::default());

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule.rule_id, CREDENTIAL_REQUEST);
}

#[test]
fn test_timestamped_merged_blob_still_attributes_agent_lines() {
    let engine = GuardrailEngine::with_defaults();
    let transcript = Transcript::merged(
        "[10:31] ote02: the site is blocked in my country\n\
         [10:32] Jane from Stake.com: sure, use a vpn",
    );

    let findings = engine.quick_check(&TicketFacts::default(), &transcript, &AgentActions::default());

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule.rule_id, GEO_CIRCUMVENTION);
    assert_eq!(findings[0].evidence[0].speaker, Speaker::Agent);
    assert_eq!(findings[0].evidence[0].text, "sure, use a vpn");
}

fn broken_check(
    _: &Guardrail,
    _: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    Err(GuardrailError::PredicateFailed {
        guardrail_id: "TEST-BROKEN".to_string(),
        message: "lookup failed".to_string(),
    })
}

fn panicking_check(
    _: &Guardrail,
    _: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    panic!("predicate bug")
}

fn always(_: &TicketFacts) -> bool {
    true
}

#[test]
fn test_failing_and_panicking_predicates_do_not_blank_the_pass() {
    let mut engine = GuardrailEngine::new();
    engine
        .register(Guardrail {
            id: "TEST-BROKEN",
            title: "broken",
            severity: Severity::High,
            applies: always,
            check: broken_check,
        })
        .unwrap();
    engine
        .register(Guardrail {
            id: "TEST-PANIC",
            title: "panics",
            severity: Severity::High,
            applies: always,
            check: panicking_check,
        })
        .unwrap();
    for guardrail in builtin::defaults() {
        engine.register(guardrail).unwrap();
    }

    let transcript = conversation(&[("Agent", "Just use a VPN and it will work.")]);
    let findings = engine.quick_check(&TicketFacts::default(), &transcript, &AgentActions::default());

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule.rule_id, GEO_CIRCUMVENTION);
}

#[test]
fn test_register_rejects_duplicate_id() {
    let mut engine = GuardrailEngine::with_defaults();
    let duplicate = engine.guardrails()[0];

    let err = engine.register(duplicate).unwrap_err();
    assert!(matches!(err, GuardrailError::DuplicateId { .. }));
    assert_eq!(engine.len(), builtin::defaults().len());
}
