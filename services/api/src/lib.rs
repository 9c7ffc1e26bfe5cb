//! Parley API Library Crate
//!
//! This library contains all the logic for the conversational-experiment
//! web service: the application state, REST handlers, matchmaking queue,
//! agent router, WebSocket session machinery, and routing. The `api` binary
//! is a thin wrapper around this library.

pub mod agents;
pub mod config;
pub mod evaluation;
pub mod handlers;
pub mod matchmaking;
pub mod models;
pub mod router;
pub mod sessions;
pub mod state;
pub mod ws;
