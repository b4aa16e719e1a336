// handlers/protected/passphrase/status.rs - GET /api/passphrase/status handler

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /api/passphrase/status - Latest migration job, or `null`
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let job = state.passphrase.status(auth.user_id).await?;
    Ok(Json(json!({ "success": true, "job": job })))
}
