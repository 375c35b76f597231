use serde::{Deserialize, Serialize};

use super::facts::{AgentActions, TicketFacts};
use super::finding::{Speaker, normalize_speaker};

const FULL_CONVERSATION_LABELS: &[&str] = &["full_conversation", "full conversation"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub speaker: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    fn is_full_conversation(&self) -> bool {
        let speaker = self.speaker.trim();
        FULL_CONVERSATION_LABELS
            .iter()
            .any(|label| speaker.eq_ignore_ascii_case(label))
    }
}

/// A support conversation, either per-message or already merged into one blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transcript {
    Messages(Vec<Message>),
    FullConversation { full_conversation: String },
}

/// One speaker-attributed line of a transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance<'a> {
    pub speaker: Speaker,
    pub label: &'a str,
    pub text: &'a str,
}

impl Transcript {
    pub fn merged(text: impl Into<String>) -> Self {
        Transcript::FullConversation {
            full_conversation: text.into(),
        }
    }

    /// Returns the merged blob when the transcript is (or was pre-merged into) one.
    fn merged_text(&self) -> Option<&str> {
        match self {
            Transcript::FullConversation { full_conversation } => Some(full_conversation),
            Transcript::Messages(messages) => match messages.as_slice() {
                [only] if only.is_full_conversation() => Some(&only.text),
                _ => None,
            },
        }
    }

    /// Plain text of the whole conversation, one `speaker: text` line per message.
    pub fn full_text(&self) -> String {
        if let Some(text) = self.merged_text() {
            return text.to_string();
        }
        match self {
            Transcript::Messages(messages) => messages
                .iter()
                .filter(|m| !m.text.trim().is_empty())
                .map(|m| {
                    if m.speaker.trim().is_empty() {
                        m.text.trim().to_string()
                    } else {
                        format!("{}: {}", m.speaker.trim(), m.text.trim())
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Transcript::FullConversation { .. } => String::new(),
        }
    }

    /// Speaker-attributed lines. Merged blobs are split on newlines and attributed from
    /// a leading `Name:` prefix after any timestamp; lines without one continue the
    /// previous speaker.
    pub fn utterances(&self) -> Vec<Utterance<'_>> {
        if let Some(text) = self.merged_text() {
            return split_merged(text);
        }
        match self {
            Transcript::Messages(messages) => messages
                .iter()
                .filter(|m| !m.text.trim().is_empty())
                .map(|m| Utterance {
                    speaker: normalize_speaker(Some(&m.speaker)),
                    label: m.speaker.trim(),
                    text: m.text.trim(),
                })
                .collect(),
            Transcript::FullConversation { .. } => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.full_text().trim().is_empty()
    }
}

fn split_merged(text: &str) -> Vec<Utterance<'_>> {
    let mut utterances = Vec::new();
    let mut current: (Speaker, &str) = (Speaker::User, "");

    for line in text.lines() {
        let line = strip_timestamp(line.trim());
        if line.is_empty() {
            continue;
        }
        let (label, body) = match line.split_once(':') {
            Some((label, body)) if is_speaker_label(label) => (label.trim(), body.trim()),
            _ => (current.1, line),
        };
        if label != current.1 {
            current = (normalize_speaker(Some(label)), label);
        }
        if !body.is_empty() {
            utterances.push(Utterance {
                speaker: current.0,
                label: current.1,
                text: body,
            });
        }
    }

    utterances
}

fn is_speaker_label(label: &str) -> bool {
    let label = label.trim();
    !label.is_empty()
        && label.len() <= 40
        && !label.contains("http")
        && !label.starts_with(['[', '('])
        && label.chars().any(char::is_alphabetic)
        && label.split_whitespace().count() <= 4
}

/// Drops leading `[10:32]`, `(2024-05-01 10:32:07)` or bare `10:32:07` stamps.
fn strip_timestamp(mut line: &str) -> &str {
    loop {
        let bracketed = line
            .strip_prefix(['[', '('])
            .and_then(|rest| {
                rest.find([']', ')'])
                    .map(move |end| (&rest[..end], &rest[end + 1..]))
            });
        let next = match bracketed {
            Some((stamp, rest)) if is_timestamp(stamp) => rest,
            _ => match line.split_once(char::is_whitespace) {
                Some((first, rest)) if is_bare_stamp(first) => rest,
                _ => return line,
            },
        };
        line = next.trim_start();
    }
}

/// A time (`10:32`) or a date (`2024-05-01`) without brackets.
fn is_bare_stamp(token: &str) -> bool {
    (token.contains(':') || token.matches(['-', '/']).count() == 2) && is_timestamp(token)
}

fn is_timestamp(s: &str) -> bool {
    let s = s.trim();
    s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ':' | '-' | '/' | '.' | ' ' | 'T' | 'Z'))
}

/// Everything the pipeline needs to evaluate one ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketInput {
    pub ticket_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub transcript: Transcript,
    #[serde(default)]
    pub facts: TicketFacts,
    #[serde(default)]
    pub actions: AgentActions,
    /// Entities extracted upstream (product names, amounts, jurisdictions).
    #[serde(default)]
    pub entities: Vec<String>,
}

impl TicketInput {
    pub fn new(ticket_id: impl Into<String>, transcript: Transcript) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            agent_id: None,
            transcript,
            facts: TicketFacts::default(),
            actions: AgentActions::default(),
            entities: Vec::new(),
        }
    }

    pub fn with_facts(mut self, facts: TicketFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_actions(mut self, actions: AgentActions) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}
