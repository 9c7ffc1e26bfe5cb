//! Axum Handlers for the REST API
//!
//! Session bootstrap and evaluation intake. Input validation failures are
//! rejected synchronously with a machine-readable error code and no state
//! mutation; ledger failures surface only as a non-fatal flag in the
//! evaluation response.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use parley_core::types::{Condition, pick_agent};
use std::{str::FromStr, sync::Arc};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    evaluation::EvaluationRecord,
    models::{
        ErrorResponse, EvaluationPayload, EvaluationResponse, StartSessionPayload,
        StartSessionResponse,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(&'static str),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(code) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: code.to_string(),
                }),
            )
                .into_response(),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "internal_error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Start a session: draw the agent assignment for the chosen condition.
#[utoipa::path(
    post,
    path = "/api/session/start",
    request_body = StartSessionPayload,
    responses(
        (status = 201, description = "Session created", body = StartSessionResponse),
        (status = 400, description = "Missing or unknown condition", body = ErrorResponse)
    )
)]
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StartSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let condition_str = payload
        .condition
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::BadRequest("condition_required"))?;
    let condition = Condition::from_str(&condition_str)
        .map_err(|_| ApiError::BadRequest("invalid_condition"))?;

    let agent = pick_agent(condition, &mut rand::rng());
    let session_id = state.sessions.create(condition, agent).await;
    info!(%session_id, %condition, %agent, "session started");

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id,
            agent_type: agent,
        }),
    ))
}

/// Submit the participant's judgment and the session's chat statistics.
#[utoipa::path(
    post,
    path = "/api/evaluation",
    request_body = EvaluationPayload,
    responses(
        (status = 200, description = "Evaluation accepted", body = EvaluationResponse),
        (status = 400, description = "Missing session id or invalid rating", body = ErrorResponse)
    )
)]
pub async fn submit_evaluation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = payload
        .session_id
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::BadRequest("session_id_required"))?;
    if !(1..=7).contains(&payload.rating) {
        return Err(ApiError::BadRequest("invalid_rating"));
    }

    // The table wins over the payload; an unknown session still gets a row
    // so a participant whose bootstrap failed is not silently dropped.
    let entry = match Uuid::parse_str(&session_id) {
        Ok(id) => state.sessions.remove(id).await,
        Err(_) => None,
    };
    let condition = entry
        .as_ref()
        .map(|e| e.condition.to_string())
        .or(payload.condition)
        .unwrap_or_else(|| "unknown".to_string());
    let agent_type = entry
        .as_ref()
        .map(|e| e.agent.to_string())
        .or(payload.agent_type)
        .unwrap_or_else(|| "unknown".to_string());

    let turns_total = payload
        .turns_total
        .unwrap_or(payload.turns_user + payload.turns_agent);
    let words_total = payload
        .words_total
        .unwrap_or(payload.words_user + payload.words_agent);

    let record = EvaluationRecord {
        timestamp: Utc::now(),
        session_id,
        condition,
        agent_type,
        turns_user: payload.turns_user,
        turns_agent: payload.turns_agent,
        turns_total,
        words_user: payload.words_user,
        words_agent: payload.words_agent,
        words_total,
        duration_seconds: payload.duration_seconds,
        rating: payload.rating,
    };

    let (logged, reason) = match state.sink.append(&record).await {
        Ok(outcome) => (!outcome.skipped, outcome.reason),
        Err(error) => {
            error!(?error, session_id = %record.session_id, "evaluation sink failed");
            (false, Some("ledger_error".to_string()))
        }
    };
    info!(session_id = %record.session_id, logged, "evaluation recorded");

    Ok((
        StatusCode::OK,
        Json(EvaluationResponse {
            ok: true,
            logged,
            reason,
        }),
    ))
}
