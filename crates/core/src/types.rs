//! Domain types shared between the core logic and the service layer.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// The experimental arm a participant selects before a session starts.
///
/// A condition is immutable once a session has been created; it determines
/// which two agent kinds the participant may be paired against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// The rule-based bot against a generative model imitating it.
    #[serde(rename = "RULE_VS_GENERATIVE")]
    RuleVsGenerative,
    /// A generative peer persona against a live human participant.
    #[serde(rename = "GENERATIVE_VS_HUMAN")]
    GenerativeVsHuman,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::RuleVsGenerative => write!(f, "RULE_VS_GENERATIVE"),
            Condition::GenerativeVsHuman => write!(f, "GENERATIVE_VS_HUMAN"),
        }
    }
}

impl FromStr for Condition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RULE_VS_GENERATIVE" => Ok(Condition::RuleVsGenerative),
            "GENERATIVE_VS_HUMAN" => Ok(Condition::GenerativeVsHuman),
            _ => Err(()),
        }
    }
}

/// The responder bound to a session for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    /// Deterministic keyword-substitution bot.
    #[serde(rename = "RULE_BASED")]
    RuleBased,
    /// Generative model instructed to imitate the rule-based bot.
    #[serde(rename = "GENERATIVE_MIMIC")]
    GenerativeMimic,
    /// Generative model posing as a fellow participant.
    #[serde(rename = "GENERATIVE_PEER")]
    GenerativePeer,
    /// A live paired participant.
    #[serde(rename = "HUMAN_PEER")]
    HumanPeer,
}

impl AgentKind {
    pub fn is_human(self) -> bool {
        matches!(self, AgentKind::HumanPeer)
    }

    /// Non-human kinds open the conversation; a live peer never does.
    pub fn speaks_first(self) -> bool {
        !self.is_human()
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::RuleBased => write!(f, "RULE_BASED"),
            AgentKind::GenerativeMimic => write!(f, "GENERATIVE_MIMIC"),
            AgentKind::GenerativePeer => write!(f, "GENERATIVE_PEER"),
            AgentKind::HumanPeer => write!(f, "HUMAN_PEER"),
        }
    }
}

/// Draws the agent assignment for a condition: a fixed 50/50 split within
/// each two-way arm.
pub fn pick_agent<R: Rng + ?Sized>(condition: Condition, rng: &mut R) -> AgentKind {
    match condition {
        Condition::RuleVsGenerative => {
            if rng.random_bool(0.5) {
                AgentKind::RuleBased
            } else {
                AgentKind::GenerativeMimic
            }
        }
        Condition::GenerativeVsHuman => {
            if rng.random_bool(0.5) {
                AgentKind::GenerativePeer
            } else {
                AgentKind::HumanPeer
            }
        }
    }
}

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// A single transcript entry.
///
/// The transcript is append-only; ordering is the order in which the session
/// accepted or received entries, not a wall-clock ordering across peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text)
    }

    /// An agent-side entry carrying a receipt timestamp, used when splicing
    /// relayed peer messages into the transcript.
    pub fn agent_at(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Agent,
            text: text.into(),
            timestamp,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }
}
