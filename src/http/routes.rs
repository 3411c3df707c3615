//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::combat::{CombatError, CombatRequest, CombatSnapshot};
use crate::http::middleware::require_signature;
use crate::http::signature::SIGNATURE_HEADER;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(SIGNATURE_HEADER),
        ])
        .allow_credentials(true);

    // Public routes (players authenticate with a session ticket)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler));

    // Internal routes (signed by the strategy layer)
    let internal_routes = Router::new()
        .route("/internal/combats", post(create_combat_handler))
        .route("/internal/combats/:match_id", get(combat_snapshot_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_signature));

    Router::new()
        .merge(public_routes)
        .merge(internal_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_combats: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_combats: state.combats.active_combats(),
    })
}

// ============================================================================
// Internal combat endpoints
// ============================================================================

async fn create_combat_handler(
    State(state): State<AppState>,
    Json(req): Json<CombatRequest>,
) -> Result<(StatusCode, Json<CombatSnapshot>), AppError> {
    info!(match_id = %req.match_id, "Combat requested");
    let snapshot = state.combats.initiate_combat(req)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn combat_snapshot_handler(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<CombatSnapshot>, AppError> {
    state
        .combats
        .snapshot(&match_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No active combat for match {}", match_id)))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl From<CombatError> for AppError {
    fn from(e: CombatError) -> Self {
        match e {
            CombatError::AlreadyActive(_) => AppError::Conflict(e.to_string()),
            CombatError::UnitNotFound(_)
            | CombatError::MissingDefinition { .. }
            | CombatError::SameUnit(_)
            | CombatError::SameOwner(_, _)
            | CombatError::InvalidArena { .. } => AppError::Unprocessable(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
