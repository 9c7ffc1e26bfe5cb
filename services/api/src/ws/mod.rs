//! WebSocket Session Management
//!
//! This module contains the core logic for driving participant sessions
//! over WebSockets. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: The per-connection state machine, from the `init` handshake
//!   through matchmaking, the timed chat phase, and teardown.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
