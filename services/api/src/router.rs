//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, EvaluationPayload, EvaluationResponse, StartSessionPayload,
        StartSessionResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::start_session, handlers::submit_evaluation),
    components(
        schemas(StartSessionPayload, StartSessionResponse, EvaluationPayload, EvaluationResponse, ErrorResponse)
    ),
    tags(
        (name = "Parley API", description = "Session bootstrap and evaluation intake for the conversational experiment")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/api/session/start", post(handlers::start_session))
        .route("/api/evaluation", post(handlers::submit_evaluation))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
