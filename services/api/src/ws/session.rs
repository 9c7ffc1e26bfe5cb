//! Manages the WebSocket connection lifecycle for a participant session.
//!
//! One task per connection drives the session through its phases: the
//! `init` handshake binds the socket to a bootstrapped session, the waiting
//! phase finds a partner (live or simulated), and the chat phase runs a
//! single `select!` loop over the socket, the countdown, the pending agent
//! reply, and peer events. Exactly one chat-ending event ever fires; a
//! reply that resolves after the end is discarded, never appended.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{
    agents::AgentReply,
    matchmaking::{Enqueued, PeerEvent, PeerLink},
    sessions::SessionEntry,
    state::AppState,
};
use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use parley_core::{stats::ChatStats, types::ChatMessage};
use std::{ops::Range, sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Simulated "agent found" delay for non-human kinds, so pairing speed does
/// not reveal the agent's identity.
const AGENT_FOUND_DELAY_MS: Range<u64> = 2000..4000;
/// How long the partner-disconnect notice stays on screen before the chat
/// phase ends.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);
/// Transcript entry recorded when the partner drops mid-chat.
const DISCONNECT_NOTICE: &str = "[technical issue - chat partner disconnected]";

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Entry point for a new connection: performs the `init` handshake and then
/// drives the session to completion.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut socket_tx, mut socket_rx) = socket.split();

    let Some(Ok(first)) = socket_rx.next().await else {
        info!("client disconnected before init");
        return;
    };
    let (session_id, entry) = match parse_init(first, &state).await {
        Ok(found) => found,
        Err(error) => {
            warn!(?error, "session init rejected");
            let _ = send_msg(
                &mut socket_tx,
                ServerMessage::Error {
                    message: error.to_string(),
                },
            )
            .await;
            return;
        }
    };

    if send_msg(&mut socket_tx, ServerMessage::SessionReady { session_id })
        .await
        .is_err()
    {
        return;
    }

    let span = info_span!("session", %session_id, agent = %entry.agent);
    async move {
        if let Err(error) = run_session(&state, &mut socket_tx, &mut socket_rx, session_id, &entry).await
        {
            warn!(?error, "session terminated with error");
        }
        info!("session finished");
    }
    .instrument(span)
    .await
}

/// Parses the `init` frame and looks up the bootstrapped session.
async fn parse_init(frame: Message, state: &Arc<AppState>) -> Result<(Uuid, SessionEntry)> {
    let Message::Text(text) = frame else {
        return Err(anyhow!("first frame must be a text init message"));
    };
    let msg: ClientMessage = serde_json::from_str(&text).context("malformed init frame")?;
    let ClientMessage::Init { session_id } = msg else {
        return Err(anyhow!("first frame must be init"));
    };
    let entry = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| anyhow!("unknown session: {session_id}"))?;
    Ok((session_id, entry))
}

async fn run_session(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    socket_rx: &mut SplitStream<WebSocket>,
    session_id: Uuid,
    entry: &SessionEntry,
) -> Result<()> {
    let link = match wait_for_partner(state, socket_tx, socket_rx, session_id, entry).await? {
        WaitOutcome::Ready(link) => link,
        WaitOutcome::ClientGone => {
            info!("client left during the waiting phase");
            return Ok(());
        }
    };

    run_chat(state, socket_tx, socket_rx, entry, link).await
}

enum WaitOutcome {
    /// Chat may begin; `Some` carries the live room for human-peer sessions.
    Ready(Option<PeerLink>),
    ClientGone,
}

/// The waiting phase: matchmaking for human-peer sessions, a simulated
/// "agent found" delay for everything else.
async fn wait_for_partner(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    socket_rx: &mut SplitStream<WebSocket>,
    session_id: Uuid,
    entry: &SessionEntry,
) -> Result<WaitOutcome> {
    if !entry.agent.is_human() {
        let delay = rand::random_range(AGENT_FOUND_DELAY_MS);
        time::sleep(Duration::from_millis(delay)).await;
        return Ok(WaitOutcome::Ready(None));
    }

    loop {
        let link = match state.matchmaker.enqueue(entry.condition, session_id).await {
            Enqueued::Paired(link) => Some(link),
            Enqueued::Waiting(mut rx) => {
                let ceiling = time::sleep(state.config.queue_wait);
                tokio::pin!(ceiling);
                let raced = loop {
                    tokio::select! {
                        result = &mut rx => break result.ok(),
                        () = &mut ceiling => break None,
                        frame = socket_rx.next() => match frame {
                            Some(Ok(Message::Close(_))) | None => {
                                state.matchmaker.cancel(session_id).await;
                                return Ok(WaitOutcome::ClientGone);
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(error)) => {
                                warn!(?error, "socket error while waiting");
                                state.matchmaker.cancel(session_id).await;
                                return Ok(WaitOutcome::ClientGone);
                            }
                        },
                    }
                };
                match raced {
                    Some(link) => Some(link),
                    // Ceiling hit. A failed cancel means pairing won the
                    // race and the link is already in the channel.
                    None => {
                        if state.matchmaker.cancel(session_id).await {
                            None
                        } else {
                            rx.try_recv().ok()
                        }
                    }
                }
            }
        };

        match link {
            Some(link) => {
                send_msg(
                    socket_tx,
                    ServerMessage::MatchFound {
                        room_id: link.room_id,
                    },
                )
                .await?;
                return Ok(WaitOutcome::Ready(Some(link)));
            }
            None => {
                // No partner inside the ceiling: a normal outcome, with a
                // retry path left open to the participant.
                send_msg(socket_tx, ServerMessage::MatchNotFound).await?;
                loop {
                    match socket_rx.next().await {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(ClientMessage::RetryQueue) => break,
                                _ => warn!("ignoring frame while unmatched"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Ok(WaitOutcome::ClientGone),
                        Some(Ok(_)) => {}
                        Some(Err(_)) => return Ok(WaitOutcome::ClientGone),
                    }
                }
            }
        }
    }
}

/// The chat phase. Returns once exactly one ending event — countdown expiry,
/// a manual end, partner loss, or the client vanishing — has fired.
async fn run_chat(
    state: &Arc<AppState>,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    socket_rx: &mut SplitStream<WebSocket>,
    entry: &SessionEntry,
    mut link: Option<PeerLink>,
) -> Result<()> {
    let chat_duration = state.config.chat_duration;
    send_msg(
        socket_tx,
        ServerMessage::ChatStarted {
            duration_seconds: chat_duration.as_secs(),
        },
    )
    .await?;

    let phase_entered = Instant::now();
    let hard_deadline = phase_entered + chat_duration;
    let deadline = time::sleep_until(hard_deadline);
    tokio::pin!(deadline);

    let mut transcript: Vec<ChatMessage> = Vec::new();
    let mut partner_left = false;
    let mut socket_open = true;

    // Non-human agents speak first. The opening runs as the initial pending
    // reply, so user input stays serialized behind it.
    let mut pending: Option<JoinHandle<String>> = if entry.agent.speaks_first() {
        let agents = state.agents.clone();
        let kind = entry.agent;
        Some(tokio::spawn(async move {
            agents.opening(kind).await.unwrap_or_default()
        }))
    } else {
        None
    };

    loop {
        tokio::select! {
            () = &mut deadline => break,

            frame = socket_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) else {
                        warn!("unparseable frame during chat");
                        continue;
                    };
                    match msg {
                        ClientMessage::SendMessage { room_id, text } => {
                            let text = text.trim().to_string();
                            if text.is_empty() {
                                continue;
                            }
                            if let (Some(sent_room), Some(live)) = (room_id, link.as_ref()) {
                                if sent_room != live.room_id {
                                    warn!(%sent_room, "utterance for a different room, dropping");
                                    continue;
                                }
                            }
                            if pending.is_some() {
                                // One outstanding utterance at a time for
                                // non-human kinds.
                                warn!("utterance while a reply is pending, dropping");
                                continue;
                            }
                            transcript.push(ChatMessage::user(text.clone()));
                            if let Some(live) = link.as_ref() {
                                live.say(text);
                            } else {
                                let agents = state.agents.clone();
                                let kind = entry.agent;
                                // The responder sees the turns before this
                                // utterance; the utterance itself rides
                                // separately.
                                let history = transcript[..transcript.len() - 1].to_vec();
                                pending = Some(tokio::spawn(async move {
                                    match agents.respond(kind, &history, &text, None).await {
                                        AgentReply::Text(reply) => reply,
                                        AgentReply::Deferred => String::new(),
                                    }
                                }));
                            }
                        }
                        ClientMessage::EndChat => break,
                        ClientMessage::Init { .. } | ClientMessage::RetryQueue => {
                            warn!("unexpected frame during chat");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    socket_open = false;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(?error, "socket error during chat");
                    socket_open = false;
                    break;
                }
            },

            reply = async {
                match pending.as_mut() {
                    Some(handle) => handle.await,
                    None => std::future::pending().await,
                }
            }, if pending.is_some() => {
                pending = None;
                match reply {
                    Ok(text) if !text.trim().is_empty() => {
                        let msg = ChatMessage::agent(text);
                        send_msg(
                            socket_tx,
                            ServerMessage::ReceiveMessage {
                                text: msg.text.clone(),
                                timestamp: msg.timestamp,
                            },
                        )
                        .await?;
                        transcript.push(msg);
                    }
                    Ok(_) => {}
                    Err(error) => warn!(?error, "reply task failed"),
                }
            },

            event = async {
                match link.as_mut() {
                    Some(live) => live.from_peer.recv().await,
                    None => std::future::pending().await,
                }
            }, if link.is_some() => {
                match event {
                    Some(PeerEvent::Message { text, timestamp }) => {
                        // Receipt order, not request order: the peer may
                        // answer while the participant is mid-thought.
                        transcript.push(ChatMessage::agent_at(text.clone(), timestamp));
                        send_msg(socket_tx, ServerMessage::ReceiveMessage { text, timestamp })
                            .await?;
                    }
                    Some(PeerEvent::Disconnected) | None => {
                        partner_left = true;
                        transcript.push(ChatMessage::system(DISCONNECT_NOTICE));
                        send_msg(socket_tx, ServerMessage::PartnerDisconnected).await?;
                        if let Some(live) = link.take() {
                            let room_id = live.room_id;
                            live.hang_up();
                            state.matchmaker.close_room(room_id).await;
                        }
                        // End after the notice has had time to be read,
                        // unless the countdown lands first.
                        let grace_end = Instant::now() + DISCONNECT_GRACE;
                        deadline.as_mut().reset(grace_end.min(hard_deadline));
                    }
                }
            },
        }
    }

    // Single-fire guard: one ending has run. Anything still in flight is
    // dropped, not appended.
    if let Some(handle) = pending.take() {
        handle.abort();
    }
    if let Some(live) = link.take() {
        let room_id = live.room_id;
        live.hang_up();
        state.matchmaker.close_room(room_id).await;
    }

    let stats = ChatStats::from_transcript(&transcript, phase_entered.elapsed());
    info!(
        turns = stats.turns_total,
        words = stats.words_total,
        partner_left,
        "chat ended"
    );
    if socket_open {
        send_msg(socket_tx, ServerMessage::ChatEnded { stats }).await?;
    }
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
