//! REST API Models
//!
//! This module defines the request and response bodies for the session
//! bootstrap and evaluation endpoints, annotated for OpenAPI generation
//! with `utoipa`.

use parley_core::types::AgentKind;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct StartSessionPayload {
    /// Wire name of the experiment arm.
    #[schema(example = "RULE_VS_GENERATIVE")]
    pub condition: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    #[schema(value_type = String, example = "RULE_BASED")]
    pub agent_type: AgentKind,
}

/// The finalized judgment for one session. Stats fields default to zero and
/// totals are derived server-side when absent.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationPayload {
    /// The id returned by the session bootstrap. Clients that could not
    /// reach the bootstrap may send a locally generated fallback id.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    #[schema(example = "RULE_VS_GENERATIVE")]
    pub condition: Option<String>,
    #[serde(default)]
    #[schema(example = "RULE_BASED")]
    pub agent_type: Option<String>,
    /// Humanness rating on the fixed 1-7 scale.
    pub rating: u8,
    #[serde(default)]
    pub turns_user: u32,
    #[serde(default)]
    pub turns_agent: u32,
    #[serde(default)]
    pub turns_total: Option<u32>,
    #[serde(default)]
    pub words_user: u32,
    #[serde(default)]
    pub words_agent: u32,
    #[serde(default)]
    pub words_total: Option<u32>,
    #[serde(default)]
    pub duration_seconds: u64,
}

#[derive(Serialize, ToSchema)]
pub struct EvaluationResponse {
    pub ok: bool,
    /// Whether the record landed in the ledger. Logging failures are
    /// surfaced here and nowhere else.
    pub logged: bool,
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code, e.g. `invalid_condition`.
    pub error: String,
}
