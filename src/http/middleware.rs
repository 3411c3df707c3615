//! Signature middleware for internal endpoints

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::AppState;
use crate::http::signature::{verify_signature, SignatureError, SIGNATURE_HEADER};

/// Largest internal request body accepted (game snapshots included)
const MAX_INTERNAL_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Middleware that requires a valid `X-Combat-Signature` over the raw body
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let (parts, body) = request.into_parts();

    let header = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| auth_error(SignatureError::Missing))?
        .to_string();

    let bytes = body::to_bytes(body, MAX_INTERNAL_BODY_BYTES)
        .await
        .map_err(|_| (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response())?;

    verify_signature(
        &bytes,
        &header,
        &state.config.internal_shared_secret,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!(path = %parts.uri.path(), error = %e, "Rejected internal request");
        auth_error(e)
    })?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn auth_error(e: SignatureError) -> Response {
    let body = serde_json::json!({ "error": e.to_string() });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
