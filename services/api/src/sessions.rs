//! In-memory session table.
//!
//! The process-wide registry of bootstrapped sessions. Entries are created
//! by the bootstrap endpoint and removed when the evaluation is submitted;
//! abandoned entries are reclaimed by a TTL purge. Nothing is persisted —
//! a restart empties the table, and participants simply start over.

use chrono::{DateTime, Utc};
use parley_core::types::{AgentKind, Condition};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A bootstrapped session left without an evaluation for this long is
/// considered abandoned.
const ABANDONED_AFTER_MINUTES: i64 = 30;

/// Everything bound to a session at bootstrap time.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub condition: Condition,
    pub agent: AgentKind,
    pub started_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionTable {
    inner: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its opaque id. Entries past the
    /// abandonment TTL are purged on the way in.
    pub async fn create(&self, condition: Condition, agent: AgentKind) -> Uuid {
        let now = Utc::now();
        let mut table = self.inner.lock().await;
        table.retain(|_, entry| {
            now.signed_duration_since(entry.started_at).num_minutes() < ABANDONED_AFTER_MINUTES
        });

        let id = Uuid::new_v4();
        table.insert(
            id,
            SessionEntry {
                condition,
                agent,
                started_at: now,
            },
        );
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionEntry> {
        self.inner.lock().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<SessionEntry> {
        self.inner.lock().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
