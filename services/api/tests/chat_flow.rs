//! Full-stack scenarios over a real listener: REST bootstrap, the rule-bot
//! chat loop with countdown expiry, human-peer matchmaking and relay, and
//! the queue wait ceiling with its retry path.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parley_api::{
    agents::AgentRouter,
    config::{Config, Provider},
    evaluation::DisabledSink,
    matchmaking::Matchmaker,
    router::create_router,
    sessions::SessionTable,
    state::AppState,
};
use parley_core::{
    llm::ChatModel,
    types::{AgentKind, ChatMessage, Condition},
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct CannedModel;

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(
        &self,
        _system_instruction: &str,
        _history: &[ChatMessage],
        _last_message: &str,
    ) -> Result<String> {
        Ok("hey, ready when you are".to_string())
    }
}

async fn spawn_app(chat_secs: u64, wait_secs: u64) -> (String, Arc<AppState>) {
    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        provider: Provider::OpenAI,
        openai_api_key: Some("test-key".to_string()),
        gemini_api_key: None,
        chat_model: "test-model".to_string(),
        log_level: tracing::Level::INFO,
        ledger_url: None,
        ledger_token: None,
        chat_duration: Duration::from_secs(chat_secs),
        queue_wait: Duration::from_secs(wait_secs),
    };
    let state = Arc::new(AppState {
        sessions: SessionTable::new(),
        matchmaker: Matchmaker::new(),
        agents: Arc::new(AgentRouter::new(Arc::new(CannedModel))),
        sink: Arc::new(DisabledSink),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("127.0.0.1:{}", addr.port()), state)
}

async fn connect_ws(addr: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send_frame(ws: &mut WsClient, frame: Value) {
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Reads the next text frame as JSON, skipping control frames.
async fn next_frame(ws: &mut WsClient, wait: Duration) -> Value {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = timeout(remaining, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed unexpectedly")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn expect_frame(ws: &mut WsClient, kind: &str, wait: Duration) -> Value {
    let frame = next_frame(ws, wait).await;
    assert_eq!(frame["type"], kind, "unexpected frame: {frame}");
    frame
}

#[tokio::test]
async fn rest_bootstrap_draws_within_the_condition() {
    let (addr, state) = spawn_app(180, 30).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/api/session/start"))
        .json(&json!({ "condition": "RULE_VS_GENERATIVE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let agent_type = body["agentType"].as_str().unwrap();
    assert!(agent_type == "RULE_BASED" || agent_type == "GENERATIVE_MIMIC");
    assert!(body["sessionId"].as_str().is_some());
    assert_eq!(state.sessions.len().await, 1);

    let response = client
        .post(format!("http://{addr}/api/session/start"))
        .json(&json!({ "condition": "SOMETHING_ELSE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_condition");
}

#[tokio::test]
async fn rule_based_session_runs_to_the_countdown() {
    let (addr, state) = spawn_app(8, 30).await;
    let session_id = state
        .sessions
        .create(Condition::RuleVsGenerative, AgentKind::RuleBased)
        .await;

    let mut ws = connect_ws(&addr).await;
    send_frame(&mut ws, json!({ "type": "init", "sessionId": session_id })).await;
    expect_frame(&mut ws, "session_ready", Duration::from_secs(2)).await;

    // Simulated pairing delay, then the chat opens and the bot speaks first.
    expect_frame(&mut ws, "chat_started", Duration::from_secs(6)).await;
    let greeting = expect_frame(&mut ws, "receive_message", Duration::from_secs(3)).await;
    assert!(!greeting["text"].as_str().unwrap().is_empty());

    send_frame(&mut ws, json!({ "type": "send_message", "text": "hello" })).await;
    let reply = expect_frame(&mut ws, "receive_message", Duration::from_secs(3)).await;
    assert!(!reply["text"].as_str().unwrap().is_empty());

    // No manual end: the countdown fires the one chat-ending transition.
    let ended = expect_frame(&mut ws, "chat_ended", Duration::from_secs(10)).await;
    let stats = &ended["stats"];
    assert_eq!(stats["turnsUser"], 1);
    assert!(stats["turnsAgent"].as_u64().unwrap() >= 2);
    assert_eq!(
        stats["turnsTotal"].as_u64().unwrap(),
        stats["turnsUser"].as_u64().unwrap() + stats["turnsAgent"].as_u64().unwrap()
    );
    assert_eq!(
        stats["wordsTotal"].as_u64().unwrap(),
        stats["wordsUser"].as_u64().unwrap() + stats["wordsAgent"].as_u64().unwrap()
    );
    let duration = stats["durationSeconds"].as_u64().unwrap();
    assert!((7..=9).contains(&duration), "duration was {duration}");

    // The evaluation submission closes out the session.
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/evaluation"))
        .json(&json!({
            "sessionId": session_id.to_string(),
            "rating": 4,
            "turnsUser": stats["turnsUser"],
            "turnsAgent": stats["turnsAgent"],
            "wordsUser": stats["wordsUser"],
            "wordsAgent": stats["wordsAgent"],
            "durationSeconds": stats["durationSeconds"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["logged"], false);
    assert_eq!(body["reason"], "missing_ledger_url");
    assert_eq!(state.sessions.len().await, 0);
}

#[tokio::test]
async fn human_peers_pair_relay_and_observe_one_disconnect() {
    let (addr, state) = spawn_app(60, 30).await;
    let first = state
        .sessions
        .create(Condition::GenerativeVsHuman, AgentKind::HumanPeer)
        .await;
    let second = state
        .sessions
        .create(Condition::GenerativeVsHuman, AgentKind::HumanPeer)
        .await;

    let mut ws1 = connect_ws(&addr).await;
    send_frame(&mut ws1, json!({ "type": "init", "sessionId": first })).await;
    expect_frame(&mut ws1, "session_ready", Duration::from_secs(2)).await;

    let mut ws2 = connect_ws(&addr).await;
    send_frame(&mut ws2, json!({ "type": "init", "sessionId": second })).await;
    expect_frame(&mut ws2, "session_ready", Duration::from_secs(2)).await;

    let found1 = expect_frame(&mut ws1, "match_found", Duration::from_secs(5)).await;
    let found2 = expect_frame(&mut ws2, "match_found", Duration::from_secs(5)).await;
    assert_eq!(found1["roomId"], found2["roomId"]);

    expect_frame(&mut ws1, "chat_started", Duration::from_secs(2)).await;
    expect_frame(&mut ws2, "chat_started", Duration::from_secs(2)).await;

    // Relay both ways; live peers never speak automatically.
    send_frame(
        &mut ws1,
        json!({ "type": "send_message", "text": "hey there friend" }),
    )
    .await;
    let relayed = expect_frame(&mut ws2, "receive_message", Duration::from_secs(3)).await;
    assert_eq!(relayed["text"], "hey there friend");

    send_frame(
        &mut ws2,
        json!({ "type": "send_message", "text": "hello back" }),
    )
    .await;
    let relayed = expect_frame(&mut ws1, "receive_message", Duration::from_secs(3)).await;
    assert_eq!(relayed["text"], "hello back");

    // One side leaves; the other sees exactly one notice, then the end.
    ws1.close(None).await.unwrap();
    expect_frame(&mut ws2, "partner_disconnected", Duration::from_secs(3)).await;

    let mut saw_another_message = false;
    let ended = loop {
        let frame = next_frame(&mut ws2, Duration::from_secs(10)).await;
        match frame["type"].as_str() {
            Some("chat_ended") => break frame,
            Some("receive_message") => saw_another_message = true,
            Some("partner_disconnected") => panic!("disconnect notice delivered twice"),
            _ => {}
        }
    };
    assert!(
        !saw_another_message,
        "no message may follow the disconnect notice"
    );

    let stats = &ended["stats"];
    assert_eq!(stats["turnsUser"], 1);
    assert_eq!(stats["turnsAgent"], 1);
    // The system notice counts on neither side.
    assert_eq!(stats["turnsTotal"], 2);

    assert_eq!(state.matchmaker.room_count().await, 0);
}

#[tokio::test]
async fn queue_times_out_then_pairs_on_retry() {
    let (addr, state) = spawn_app(60, 1).await;
    let first = state
        .sessions
        .create(Condition::GenerativeVsHuman, AgentKind::HumanPeer)
        .await;
    let second = state
        .sessions
        .create(Condition::GenerativeVsHuman, AgentKind::HumanPeer)
        .await;

    let mut ws1 = connect_ws(&addr).await;
    send_frame(&mut ws1, json!({ "type": "init", "sessionId": first })).await;
    expect_frame(&mut ws1, "session_ready", Duration::from_secs(2)).await;

    // Nobody else within the ceiling: a normal outcome, not an error.
    expect_frame(&mut ws1, "match_not_found", Duration::from_secs(4)).await;
    assert_eq!(
        state
            .matchmaker
            .waiting_count(Condition::GenerativeVsHuman)
            .await,
        0,
        "timed-out entry must leave the queue"
    );

    send_frame(&mut ws1, json!({ "type": "retry_queue" })).await;

    let mut ws2 = connect_ws(&addr).await;
    send_frame(&mut ws2, json!({ "type": "init", "sessionId": second })).await;
    expect_frame(&mut ws2, "session_ready", Duration::from_secs(2)).await;

    let found1 = expect_frame(&mut ws1, "match_found", Duration::from_secs(3)).await;
    let found2 = expect_frame(&mut ws2, "match_found", Duration::from_secs(3)).await;
    assert_eq!(found1["roomId"], found2["roomId"]);
}
