//! Routes utterances to the assigned responder.
//!
//! One contract over three very different backends: a synchronous rule
//! engine, a generative model a network call away, and a live peer who may
//! answer whenever they please. Each non-human kind also sleeps a
//! calibrated delay band before replying, so response time alone is not a
//! reliable tell of which backend served the turn.

use crate::matchmaking::PeerLink;
use parley_core::{
    llm::ChatModel,
    personas,
    rulebot::RuleBot,
    types::{AgentKind, ChatMessage},
};
use std::{ops::Range, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::warn;

/// Neutral stand-in used when the generative provider fails mid-session. A
/// single provider hiccup must never surface as an error bubble or abort
/// the session.
const FILLER_REPLY: &str = "Thinking...";

const RULE_DELAY_MS: Range<u64> = 500..1000;
const MIMIC_DELAY_MS: Range<u64> = 1000..2000;
const PEER_DELAY_MS: Range<u64> = 1500..3000;
/// Pause before the opening utterance, covering the "agent is connecting"
/// beat at the start of the chat.
const OPENING_DELAY_MS: Range<u64> = 800..1300;

/// Outcome of dispatching one utterance.
#[derive(Debug, PartialEq, Eq)]
pub enum AgentReply {
    /// The responder produced text to append as the agent's turn.
    Text(String),
    /// The utterance was relayed to a live peer; the reply, if any, arrives
    /// later as a peer event.
    Deferred,
}

pub struct AgentRouter {
    rule: Mutex<RuleBot>,
    model: Arc<dyn ChatModel>,
}

impl AgentRouter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            rule: Mutex::new(RuleBot::new()),
            model,
        }
    }

    /// The agent's automatic first utterance, or `None` for kinds that
    /// never speak first.
    pub async fn opening(&self, kind: AgentKind) -> Option<String> {
        match kind {
            AgentKind::HumanPeer => None,
            AgentKind::RuleBased => {
                sleep_in(OPENING_DELAY_MS).await;
                Some(self.rule.lock().await.opening())
            }
            AgentKind::GenerativeMimic => {
                sleep_in(OPENING_DELAY_MS).await;
                Some(
                    self.generate(personas::MIMIC_PERSONA, &[], personas::MIMIC_OPENING_CUE)
                        .await,
                )
            }
            AgentKind::GenerativePeer => {
                sleep_in(OPENING_DELAY_MS).await;
                Some(
                    self.generate(personas::PEER_PERSONA, &[], personas::PEER_OPENING_CUE)
                        .await,
                )
            }
        }
    }

    /// Produces the reply to one utterance. `peer` must be the live link
    /// for human-peer sessions; for every other kind it is ignored.
    pub async fn respond(
        &self,
        kind: AgentKind,
        history: &[ChatMessage],
        text: &str,
        peer: Option<&PeerLink>,
    ) -> AgentReply {
        match kind {
            AgentKind::RuleBased => {
                sleep_in(RULE_DELAY_MS).await;
                AgentReply::Text(self.rule.lock().await.transform(text))
            }
            AgentKind::GenerativeMimic => {
                sleep_in(MIMIC_DELAY_MS).await;
                AgentReply::Text(self.generate(personas::MIMIC_PERSONA, history, text).await)
            }
            AgentKind::GenerativePeer => {
                sleep_in(PEER_DELAY_MS).await;
                AgentReply::Text(self.generate(personas::PEER_PERSONA, history, text).await)
            }
            AgentKind::HumanPeer => {
                match peer {
                    Some(link) => link.say(text),
                    None => warn!("utterance for a human peer without a live room, dropping"),
                }
                AgentReply::Deferred
            }
        }
    }

    async fn generate(&self, persona: &str, history: &[ChatMessage], last: &str) -> String {
        match self.model.complete(persona, history, last).await {
            Ok(text) => text,
            Err(error) => {
                warn!(?error, "generative call failed, substituting filler");
                FILLER_REPLY.to_string()
            }
        }
    }
}

async fn sleep_in(band: Range<u64>) {
    let ms = rand::random_range(band);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
