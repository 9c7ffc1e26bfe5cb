//! Shared Application State
//!
//! This module defines the `AppState` struct, which owns the process-wide
//! session table and matchmaking queue and holds the shared service
//! clients. All cross-session mutation is funneled through these fields.

use crate::{
    agents::AgentRouter, config::Config, evaluation::EvaluationSink, matchmaking::Matchmaker,
    sessions::SessionTable,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub sessions: SessionTable,
    pub matchmaker: Matchmaker,
    pub agents: Arc<AgentRouter>,
    pub sink: Arc<dyn EvaluationSink>,
    pub config: Arc<Config>,
}
