use crate::domain::{RestrictionState, RiskLevel, TicketFacts};

pub struct Subcategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    /// Extra mandatory tags contributed by a hit in this subcategory.
    pub tags: &'static [&'static str],
}

pub struct KeywordRule {
    pub category: &'static str,
    pub risk: RiskLevel,
    pub tags: &'static [&'static str],
    pub subcategories: &'static [Subcategory],
}

pub struct FactRule {
    pub name: &'static str,
    pub applies: fn(&TicketFacts) -> bool,
    pub tags: &'static [&'static str],
    pub risk: Option<RiskLevel>,
    /// `(category, subcategory)` used when no keyword matched.
    pub category: Option<(&'static str, &'static str)>,
}

/// Keyword groups in priority order.
pub static KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        category: "responsible_gambling",
        risk: RiskLevel::Critical,
        tags: &["responsible_gambling"],
        subcategories: &[
            Subcategory {
                name: "self_exclusion",
                keywords: &["self exclusion", "self excluded", "self exclude", "exclude myself"],
                tags: &["self_exclusion"],
            },
            Subcategory {
                name: "cooling_off",
                keywords: &["cooling off", "cool off", "time out", "take a break"],
                tags: &["cooling_off"],
            },
            Subcategory {
                name: "limits",
                keywords: &["deposit limit", "loss limit", "wager limit", "reality check"],
                tags: &["gambling_limits"],
            },
            Subcategory {
                name: "problem_gambling",
                keywords: &["addiction", "addicted", "gambling problem", "problem gambling", "can't stop", "cant stop"],
                tags: &["problem_gambling"],
            },
        ],
    },
    KeywordRule {
        category: "payments",
        risk: RiskLevel::High,
        tags: &["payments"],
        subcategories: &[
            Subcategory {
                name: "withdrawal",
                keywords: &["withdraw", "withdrawal", "withdrawals", "cash out", "cashout", "payout"],
                tags: &["withdrawal"],
            },
            Subcategory {
                name: "deposit",
                keywords: &["deposit", "deposits", "top up"],
                tags: &["deposit"],
            },
            Subcategory {
                name: "refund",
                keywords: &["refund", "chargeback", "charged twice"],
                tags: &["refund"],
            },
        ],
    },
    KeywordRule {
        category: "account_access",
        risk: RiskLevel::Medium,
        tags: &["account_access"],
        subcategories: &[
            Subcategory {
                name: "password",
                keywords: &["password", "reset link", "forgot"],
                tags: &["password"],
            },
            Subcategory {
                name: "login",
                keywords: &["log in", "login", "sign in", "locked out", "cannot access", "can't access"],
                tags: &["login"],
            },
            Subcategory {
                name: "two_factor",
                keywords: &["2fa", "two factor", "authenticator", "verification code"],
                tags: &["two_factor"],
            },
        ],
    },
    KeywordRule {
        category: "kyc",
        risk: RiskLevel::High,
        tags: &["kyc"],
        subcategories: &[Subcategory {
            name: "verification",
            keywords: &["kyc", "verify my identity", "identity verification", "proof of address", "passport", "id document", "documents"],
            tags: &[],
        }],
    },
    KeywordRule {
        category: "bonuses",
        risk: RiskLevel::Medium,
        tags: &["bonuses"],
        subcategories: &[
            Subcategory {
                name: "bonus",
                keywords: &["bonus", "bonuses", "free spins", "promo", "promotion", "cashback"],
                tags: &[],
            },
            Subcategory {
                name: "vip",
                keywords: &["vip", "rakeback", "reload"],
                tags: &["vip"],
            },
        ],
    },
    KeywordRule {
        category: "betting",
        risk: RiskLevel::Medium,
        tags: &["betting"],
        subcategories: &[
            Subcategory {
                name: "settlement",
                keywords: &["bet settled", "settlement", "void bet", "voided"],
                tags: &["bet_settlement"],
            },
            Subcategory {
                name: "wagering",
                keywords: &["bet", "bets", "wager", "wagering", "odds", "casino", "slot", "slots"],
                tags: &[],
            },
        ],
    },
];

fn is_self_excluded(facts: &TicketFacts) -> bool {
    facts.account_restriction_state == RestrictionState::SelfExcluded
}

fn is_cooling_off(facts: &TicketFacts) -> bool {
    facts.account_restriction_state == RestrictionState::CoolingOff
}

fn regulator_flagged(facts: &TicketFacts) -> bool {
    facts.regulator_flagged.is_yes()
}

fn regulated_region(facts: &TicketFacts) -> bool {
    facts.regulated_region.is_yes()
}

fn restricted_region(facts: &TicketFacts) -> bool {
    facts.restricted_region.is_yes()
}

const GAMBLING_HARM_FLAGS: &[&str] = &["problem_gambling", "gambling_harm", "vulnerable", "affordability"];
const FRAUD_FLAGS: &[&str] = &["fraud", "chargeback", "aml", "multi_accounting"];

fn gambling_harm_flagged(facts: &TicketFacts) -> bool {
    GAMBLING_HARM_FLAGS.iter().any(|f| facts.has_risk_flag(f))
}

fn fraud_flagged(facts: &TicketFacts) -> bool {
    FRAUD_FLAGS.iter().any(|f| facts.has_risk_flag(f))
}

fn kyc_unverified(facts: &TicketFacts) -> bool {
    facts.kyc_verified.is_no()
}

/// Fact-driven contributions, evaluated after the keyword pass.
pub static FACT_RULES: &[FactRule] = &[
    FactRule {
        name: "self_excluded",
        applies: is_self_excluded,
        tags: &["responsible_gambling", "self_exclusion"],
        risk: Some(RiskLevel::Critical),
        category: Some(("responsible_gambling", "self_exclusion")),
    },
    FactRule {
        name: "cooling_off",
        applies: is_cooling_off,
        tags: &["responsible_gambling", "cooling_off"],
        risk: Some(RiskLevel::Critical),
        category: Some(("responsible_gambling", "cooling_off")),
    },
    FactRule {
        name: "regulator_flagged",
        applies: regulator_flagged,
        tags: &["regulatory"],
        risk: Some(RiskLevel::Critical),
        category: None,
    },
    FactRule {
        name: "gambling_harm_flag",
        applies: gambling_harm_flagged,
        tags: &["responsible_gambling", "vulnerable_customer"],
        risk: Some(RiskLevel::Critical),
        category: None,
    },
    FactRule {
        name: "fraud_flag",
        applies: fraud_flagged,
        tags: &["fraud_risk"],
        risk: Some(RiskLevel::High),
        category: None,
    },
    FactRule {
        name: "regulated_region",
        applies: regulated_region,
        tags: &["regulated_region"],
        risk: Some(RiskLevel::High),
        category: None,
    },
    FactRule {
        name: "restricted_region",
        applies: restricted_region,
        tags: &["geo_restriction"],
        risk: Some(RiskLevel::High),
        category: None,
    },
    FactRule {
        name: "kyc_unverified",
        applies: kyc_unverified,
        tags: &["kyc"],
        risk: None,
        category: None,
    },
    FactRule {
        name: "passwordless_account",
        applies: TicketFacts::lacks_password,
        tags: &["passwordless_account"],
        risk: None,
        category: None,
    },
];
