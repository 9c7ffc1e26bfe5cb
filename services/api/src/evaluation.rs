//! Evaluation records and the external ledger sink.
//!
//! The ledger is an append-only external service, one row per completed
//! session. Its availability never gates the participant flow: failures
//! collapse into a `logged` flag plus a reason code in the submission
//! response.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

/// One finalized row for the experiment ledger.
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub condition: String,
    pub agent_type: String,
    pub turns_user: u32,
    pub turns_agent: u32,
    pub turns_total: u32,
    pub words_user: u32,
    pub words_agent: u32,
    pub words_total: u32,
    pub duration_seconds: u64,
    pub rating: u8,
}

impl EvaluationRecord {
    /// Ledger column order: timestamp first, rating last.
    pub fn to_row(&self) -> Vec<serde_json::Value> {
        vec![
            json!(self.timestamp.to_rfc3339()),
            json!(self.session_id),
            json!(self.condition),
            json!(self.agent_type),
            json!(self.turns_user),
            json!(self.turns_agent),
            json!(self.turns_total),
            json!(self.words_user),
            json!(self.words_agent),
            json!(self.words_total),
            json!(self.duration_seconds),
            json!(self.rating),
        ]
    }
}

/// The result of attempting to append a record.
#[derive(Debug, Clone, Default)]
pub struct SinkOutcome {
    pub skipped: bool,
    pub reason: Option<String>,
}

/// An append-only external ledger for finalized session records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationSink: Send + Sync {
    async fn append(&self, record: &EvaluationRecord) -> Result<SinkOutcome>;
}

/// Appends rows to a spreadsheet-style ledger endpoint over HTTP.
pub struct HttpLedgerSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpLedgerSink {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            token,
        }
    }
}

#[async_trait]
impl EvaluationSink for HttpLedgerSink {
    async fn append(&self, record: &EvaluationRecord) -> Result<SinkOutcome> {
        let body = json!({ "values": [record.to_row()] });
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "ledger endpoint returned {} for session {}",
                response.status(),
                record.session_id
            ));
        }
        Ok(SinkOutcome::default())
    }
}

/// Used when no ledger endpoint is configured: rows are dropped and flagged
/// as skipped, mirroring a deployment that simply has logging turned off.
pub struct DisabledSink;

#[async_trait]
impl EvaluationSink for DisabledSink {
    async fn append(&self, _record: &EvaluationRecord) -> Result<SinkOutcome> {
        Ok(SinkOutcome {
            skipped: true,
            reason: Some("missing_ledger_url".to_string()),
        })
    }
}
