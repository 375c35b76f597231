//! Built-in guardrails.
//!
//! Each entry is a row in [`defaults`]: an id, a severity, a precondition over facts and a
//! check. Adding a rule means adding a row.

use super::engine::{Guardrail, GuardrailContext};
use super::error::GuardrailError;
use crate::domain::{Finding, RestrictionState, Severity, Speaker, TicketFacts};

pub const PASSWORD_RESET_WITHOUT_PASSWORD: &str = "GR-PASSWORD-RESET-NO-PASSWORD";
pub const SELF_EXCLUSION_PROMOTION: &str = "GR-SELF-EXCLUSION-PROMOTION";
pub const SELF_EXCLUSION_REVERSAL: &str = "GR-SELF-EXCLUSION-REVERSAL";
pub const COOLING_OFF_PROMOTION: &str = "GR-COOLING-OFF-PROMOTION";
pub const UNVERIFIED_WITHDRAWAL_PROMISE: &str = "GR-KYC-WITHDRAWAL-PROMISE";
pub const GEO_CIRCUMVENTION: &str = "GR-GEO-CIRCUMVENTION";
pub const CREDENTIAL_REQUEST: &str = "GR-CREDENTIAL-REQUEST";

const PASSWORD_RESET_PHRASES: &[&str] = &[
    "reset your password",
    "password reset",
    "forgot password",
    "forgot your password",
    "change your password",
    "reset link",
];

const PROMOTION_PHRASES: &[&str] = &[
    "bonus",
    "free spin",
    "free bet",
    "promotion",
    "promo code",
    "deposit match",
    "cashback",
    "reload offer",
    "odds boost",
    "vip program",
    "place a bet",
];

const REVERSAL_PHRASES: &[&str] = &[
    "lift your self-exclusion",
    "lift the self-exclusion",
    "lift your exclusion",
    "remove the self-exclusion",
    "remove your self-exclusion",
    "cancel your self-exclusion",
    "end your self-exclusion",
    "reopen your account",
    "reactivate your account",
];

const WITHDRAWAL_PROMISE_PHRASES: &[&str] = &[
    "withdrawal will be processed",
    "withdrawal has been approved",
    "withdrawal is approved",
    "you can withdraw now",
    "we will process your withdrawal",
    "funds will arrive",
    "funds will be in your account",
];

const GEO_CIRCUMVENTION_PHRASES: &[&str] = &[
    "use a vpn",
    "try a vpn",
    "turn on a vpn",
    "turn on your vpn",
    "connect through a vpn",
    "connect via vpn",
    "use a proxy",
    "change your location",
    "mirror site",
];

const CREDENTIAL_PHRASES: &[&str] = &[
    "send me your password",
    "share your password",
    "tell me your password",
    "provide your password",
    "what is your password",
    "your 2fa code",
    "send me the code",
    "full card number",
    "cvv",
];

/// The default guardrail table, in evaluation order.
pub fn defaults() -> Vec<Guardrail> {
    vec![
        Guardrail {
            id: PASSWORD_RESET_WITHOUT_PASSWORD,
            title: "No password-reset flow for accounts without a password",
            severity: Severity::High,
            applies: TicketFacts::lacks_password,
            check: check_password_reset,
        },
        Guardrail {
            id: SELF_EXCLUSION_PROMOTION,
            title: "No wagering or bonus promotion to self-excluded accounts",
            severity: Severity::Critical,
            applies: is_self_excluded,
            check: check_restricted_promotion,
        },
        Guardrail {
            id: SELF_EXCLUSION_REVERSAL,
            title: "Self-exclusion cannot be lifted by support",
            severity: Severity::Critical,
            applies: is_self_excluded,
            check: check_self_exclusion_reversal,
        },
        Guardrail {
            id: COOLING_OFF_PROMOTION,
            title: "No promotion to accounts in a cooling-off period",
            severity: Severity::High,
            applies: is_cooling_off,
            check: check_restricted_promotion,
        },
        Guardrail {
            id: UNVERIFIED_WITHDRAWAL_PROMISE,
            title: "No withdrawal commitments before KYC is complete",
            severity: Severity::High,
            applies: kyc_incomplete,
            check: check_withdrawal_promise,
        },
        Guardrail {
            id: GEO_CIRCUMVENTION,
            title: "Never advise circumventing geo-restrictions",
            severity: Severity::Critical,
            applies: always,
            check: check_geo_circumvention,
        },
        Guardrail {
            id: CREDENTIAL_REQUEST,
            title: "Never request passwords, one-time codes or full card details",
            severity: Severity::Critical,
            applies: always,
            check: check_credential_request,
        },
    ]
}

fn always(_: &TicketFacts) -> bool {
    true
}

fn is_self_excluded(facts: &TicketFacts) -> bool {
    facts.account_restriction_state == RestrictionState::SelfExcluded
}

fn is_cooling_off(facts: &TicketFacts) -> bool {
    facts.account_restriction_state == RestrictionState::CoolingOff
}

fn kyc_incomplete(facts: &TicketFacts) -> bool {
    facts.kyc_verified.is_no()
}

fn check_password_reset(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    let mut line = ctx.agent_line_with(PASSWORD_RESET_PHRASES);
    // a reset macro counts even when the wording is paraphrased
    if line.is_none() && (ctx.agent_used("password reset") || ctx.agent_used("password_reset")) {
        line = ctx
            .utterances()
            .iter()
            .find(|u| u.speaker == Speaker::Agent);
    }

    let Some(line) = line else {
        return Ok(None);
    };
    Ok(Some(g.violation(
        "Agent directed a password reset on an account that has no password set.",
        "Explain how to sign in with the account's social or magic-link method instead.",
        line,
    )))
}

fn check_restricted_promotion(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    let state = ctx.facts.account_restriction_state.as_str();
    Ok(ctx.agent_line_with(PROMOTION_PHRASES).map(|line| {
        g.violation(
            format!("Agent discussed promotions or wagering with a {state} account."),
            "Do not mention bonuses, promotions or betting; point to responsible-gambling support.",
            line,
        )
    }))
}

fn check_self_exclusion_reversal(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    Ok(ctx.agent_line_with(REVERSAL_PHRASES).map(|line| {
        g.violation(
            "Agent offered to lift or shorten an active self-exclusion.",
            "State that the exclusion runs its full term and cannot be reversed by support.",
            line,
        )
    }))
}

fn check_withdrawal_promise(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    Ok(ctx.agent_line_with(WITHDRAWAL_PROMISE_PHRASES).map(|line| {
        g.violation(
            "Agent committed to a withdrawal while identity verification is incomplete.",
            "Explain that withdrawals are released only after KYC verification completes.",
            line,
        )
    }))
}

fn check_geo_circumvention(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    Ok(ctx.agent_line_with(GEO_CIRCUMVENTION_PHRASES).map(|line| {
        g.violation(
            "Agent suggested a way around regional restrictions.",
            "Explain that the service is unavailable in the customer's region.",
            line,
        )
    }))
}

fn check_credential_request(
    g: &Guardrail,
    ctx: &GuardrailContext<'_>,
) -> Result<Option<Finding>, GuardrailError> {
    Ok(ctx.agent_line_with(CREDENTIAL_PHRASES).map(|line| {
        g.violation(
            "Agent asked the customer for secret credentials.",
            "Never request passwords, one-time codes or card security details.",
            line,
        )
    }))
}
