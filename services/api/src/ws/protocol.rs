//! Defines the WebSocket message protocol between the participant client and
//! the API server.
//!
//! Bot replies, generated openings, and relayed human messages all arrive as
//! the same `receive_message` frame: the wire never reveals which backend
//! served a turn.

use chrono::{DateTime, Utc};
use parley_core::stats::ChatStats;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Binds the connection to a bootstrapped session. Must be the first frame.
    #[serde(rename_all = "camelCase")]
    Init { session_id: Uuid },
    /// One utterance from the participant. `room_id`, when present, must
    /// match the session's live room.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        #[serde(default)]
        room_id: Option<Uuid>,
        text: String,
    },
    /// Ends the chat phase early.
    EndChat,
    /// Re-enters the matchmaking queue after an unsuccessful wait.
    RetryQueue,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the connection is bound to the session.
    #[serde(rename_all = "camelCase")]
    SessionReady { session_id: Uuid },
    /// A live partner was found; the chat starts next.
    #[serde(rename_all = "camelCase")]
    MatchFound { room_id: Uuid },
    /// The wait ceiling passed with no partner. A normal outcome — the
    /// client may retry or fall back.
    MatchNotFound,
    /// The chat phase has begun and the countdown is running.
    #[serde(rename_all = "camelCase")]
    ChatStarted { duration_seconds: u64 },
    /// The partner's next utterance, whoever or whatever produced it.
    ReceiveMessage {
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// The live partner dropped; the chat ends after a short grace.
    PartnerDisconnected,
    /// The chat phase is over; on to the evaluation.
    ChatEnded { stats: ChatStats },
    /// Reports a fatal error to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn client_frames_parse_from_their_wire_shapes() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"init","sessionId":"{id}"}}"#);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::Init { session_id } if session_id == id));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"send_message","text":"hello"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SendMessage { room_id: None, text } if text == "hello"
        ));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"end_chat"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::EndChat));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"retry_queue"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::RetryQueue));
    }

    #[test]
    fn server_frames_carry_snake_case_tags_and_camel_case_fields() {
        let json = serde_json::to_value(ServerMessage::ChatStarted {
            duration_seconds: 180,
        })
        .unwrap();
        assert_eq!(json["type"], "chat_started");
        assert_eq!(json["durationSeconds"], 180);

        let room_id = Uuid::new_v4();
        let json = serde_json::to_value(ServerMessage::MatchFound { room_id }).unwrap();
        assert_eq!(json["type"], "match_found");
        assert_eq!(json["roomId"], room_id.to_string());

        let json = serde_json::to_value(ServerMessage::PartnerDisconnected).unwrap();
        assert_eq!(json["type"], "partner_disconnected");
    }

    #[test]
    fn chat_ended_embeds_the_stats_wire_shape() {
        let stats = ChatStats::from_transcript(&[], Duration::from_secs(9));
        let json = serde_json::to_value(ServerMessage::ChatEnded { stats }).unwrap();
        assert_eq!(json["type"], "chat_ended");
        assert_eq!(json["stats"]["durationSeconds"], 9);
        assert_eq!(json["stats"]["turnsTotal"], 0);
    }
}
