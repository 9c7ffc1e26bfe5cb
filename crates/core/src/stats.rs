//! Per-session chat statistics.

use crate::types::{ChatMessage, Sender};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregate turn and word counts for a finished chat.
///
/// Derived once from the frozen transcript when the chat phase ends; never
/// stored independently. System notices belong to neither side, so the
/// totals are always exactly the per-side sums regardless of which backend
/// served the turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStats {
    pub turns_user: u32,
    pub turns_agent: u32,
    pub turns_total: u32,
    pub words_user: u32,
    pub words_agent: u32,
    pub words_total: u32,
    pub duration_seconds: u64,
}

impl ChatStats {
    pub fn from_transcript(transcript: &[ChatMessage], duration: Duration) -> Self {
        let mut turns_user = 0;
        let mut turns_agent = 0;
        let mut words_user = 0;
        let mut words_agent = 0;

        for msg in transcript {
            match msg.sender {
                Sender::User => {
                    turns_user += 1;
                    words_user += count_words(&msg.text);
                }
                Sender::Agent => {
                    turns_agent += 1;
                    words_agent += count_words(&msg.text);
                }
                Sender::System => {}
            }
        }

        Self {
            turns_user,
            turns_agent,
            turns_total: turns_user + turns_agent,
            words_user,
            words_agent,
            words_total: words_user + words_agent,
            duration_seconds: duration.as_secs_f64().round() as u64,
        }
    }
}

/// Whitespace-delimited tokens of the trimmed text.
fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
