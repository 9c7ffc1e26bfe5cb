//! Main Entrypoint for the Parley API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the shared services (chat model client, evaluation sink).
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use parley_api::{
    agents::AgentRouter,
    config::{Config, Provider},
    evaluation::{DisabledSink, EvaluationSink, HttpLedgerSink},
    matchmaking::Matchmaker,
    router::create_router,
    sessions::SessionTable,
    state::AppState,
};
use parley_core::llm::{ChatModel, OpenAICompatibleClient};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let model: Arc<dyn ChatModel> = match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            let api_key = config
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY missing after validation")?;
            Arc::new(OpenAICompatibleClient::with_endpoint(
                api_key,
                "https://api.openai.com/v1/",
                config.chat_model.clone(),
            ))
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            let api_key = config
                .gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY missing after validation")?;
            Arc::new(OpenAICompatibleClient::with_endpoint(
                api_key,
                "https://generativelanguage.googleapis.com/v1beta/openai",
                config.chat_model.clone(),
            ))
        }
    };

    let sink: Arc<dyn EvaluationSink> = match &config.ledger_url {
        Some(url) => {
            info!(%url, "Evaluation ledger enabled.");
            Arc::new(HttpLedgerSink::new(url.clone(), config.ledger_token.clone()))
        }
        None => {
            info!("No ledger configured; evaluation rows will be skipped.");
            Arc::new(DisabledSink)
        }
    };

    let app_state = Arc::new(AppState {
        sessions: SessionTable::new(),
        matchmaker: Matchmaker::new(),
        agents: Arc::new(AgentRouter::new(model)),
        sink,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
