use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::EngineError;
use crate::service::{RecommendationRequest, RecommendationService};

#[derive(Clone)]
pub struct AppState {
    pub service: RecommendationService,
}

/// Build the Axum router for the API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(config_handler))
        .route("/api/config/version", get(config_version_handler))
        .route("/api/config/caller/:id", get(caller_config_handler))
        .route("/api/recommendations", post(recommendations_handler))
        .route("/api/gate", get(gate_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Invalid input is the caller's fault; everything else is ours.
fn error_response(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast_ref::<EngineError>() {
        Some(EngineError::InvalidPrediction(_)) | Some(EngineError::InvalidConfigVersion(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => {
            error!("API error: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/config
async fn config_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .service
        .manager()
        .get_effective_config()
        .map(Json)
        .map_err(error_response)
}

/// GET /api/config/version
async fn config_version_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .service
        .manager()
        .get_config_version()
        .map(|v| Json(serde_json::json!({ "version": v })))
        .map_err(error_response)
}

/// GET /api/config/caller/:id
async fn caller_config_handler(
    State(state): State<Arc<AppState>>,
    Path(caller_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .service
        .manager()
        .get_effective_config_for_caller(&caller_id)
        .map(Json)
        .map_err(error_response)
}

/// POST /api/recommendations
async fn recommendations_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .service
        .recommend(&request)
        .map(Json)
        .map_err(error_response)
}

/// GET /api/gate
async fn gate_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.service.gate().map(Json).map_err(error_response)
}
