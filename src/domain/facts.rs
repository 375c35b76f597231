//! Account facts and agent side-information supplied by the system of record.
//!
//! Every field defaults to an explicit "unknown" so partially populated records
//! deserialize without guessing.

use serde::{Deserialize, Serialize};

/// A yes/no attribute that may not be known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Yes,
    No,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Flag {
    pub fn is_yes(&self) -> bool {
        matches!(self, Flag::Yes)
    }

    pub fn is_no(&self) -> bool {
        matches!(self, Flag::No)
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Flag::Yes } else { Flag::No }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password,
    Google,
    Apple,
    Facebook,
    MagicLink,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AuthMethod {
    /// Sign-in methods that never set a password on the account.
    pub fn is_passwordless(&self) -> bool {
        matches!(
            self,
            AuthMethod::Google | AuthMethod::Apple | AuthMethod::Facebook | AuthMethod::MagicLink
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionState {
    None,
    SelfExcluded,
    CoolingOff,
    Suspended,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RestrictionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionState::None => "none",
            RestrictionState::SelfExcluded => "self_excluded",
            RestrictionState::CoolingOff => "cooling_off",
            RestrictionState::Suspended => "suspended",
            RestrictionState::Closed => "closed",
            RestrictionState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketFacts {
    pub auth_method: AuthMethod,
    pub has_password: Flag,
    pub email_verified: Flag,
    pub two_factor_enabled: Flag,
    pub kyc_verified: Flag,
    pub account_restriction_state: RestrictionState,
    /// ISO region code, `"unknown"` when not supplied.
    pub region: String,
    pub regulated_region: Flag,
    pub restricted_region: Flag,
    pub regulator_flagged: Flag,
    pub risk_flags: Vec<String>,
}

impl TicketFacts {
    /// `true` when the account is known to have no password set.
    pub fn lacks_password(&self) -> bool {
        self.has_password.is_no()
            || (self.has_password == Flag::Unknown && self.auth_method.is_passwordless())
    }

    pub fn region(&self) -> &str {
        if self.region.trim().is_empty() {
            "unknown"
        } else {
            &self.region
        }
    }

    pub fn has_risk_flag(&self, flag: &str) -> bool {
        self.risk_flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// One line per known attribute; unknown attributes are omitted.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.auth_method != AuthMethod::Unknown {
            lines.push(format!("auth_method: {:?}", self.auth_method).to_lowercase());
        }
        for (name, flag) in [
            ("has_password", self.has_password),
            ("email_verified", self.email_verified),
            ("two_factor_enabled", self.two_factor_enabled),
            ("kyc_verified", self.kyc_verified),
            ("regulated_region", self.regulated_region),
            ("restricted_region", self.restricted_region),
            ("regulator_flagged", self.regulator_flagged),
        ] {
            if flag != Flag::Unknown {
                lines.push(format!("{name}: {}", if flag.is_yes() { "yes" } else { "no" }));
            }
        }
        if self.account_restriction_state != RestrictionState::Unknown {
            lines.push(format!(
                "account_restriction_state: {}",
                self.account_restriction_state.as_str()
            ));
        }
        if self.region() != "unknown" {
            lines.push(format!("region: {}", self.region));
        }
        if !self.risk_flags.is_empty() {
            lines.push(format!("risk_flags: {}", self.risk_flags.join(", ")));
        }
        lines
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentActions {
    pub macros_used: Vec<String>,
    pub links_sent: Vec<String>,
    pub tags_applied: Vec<String>,
}

impl AgentActions {
    pub fn is_empty(&self) -> bool {
        self.macros_used.is_empty() && self.links_sent.is_empty() && self.tags_applied.is_empty()
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.macros_used.is_empty() {
            lines.push(format!("macros_used: {}", self.macros_used.join(", ")));
        }
        if !self.links_sent.is_empty() {
            lines.push(format!("links_sent: {}", self.links_sent.join(", ")));
        }
        if !self.tags_applied.is_empty() {
            lines.push(format!("tags_applied: {}", self.tags_applied.join(", ")));
        }
        lines
    }
}
