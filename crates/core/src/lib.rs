//! Core logic for the blinded conversational experiment.
//!
//! This crate is free of any HTTP or WebSocket machinery. It holds the
//! domain types shared across the service, the deterministic rule-based
//! responder, the generative chat-model client, the persona instructions
//! fed to generative agents, and the chat statistics computed when a
//! session ends.

pub mod llm;
pub mod personas;
pub mod rulebot;
pub mod stats;
pub mod types;
