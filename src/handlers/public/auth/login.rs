// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::State;
use serde::Deserialize;

use super::AuthPayload;
use crate::app::AppState;
use crate::auth::verify_password;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login - Exchange credentials for a JWT
///
/// Unknown email, wrong password and missing fields all answer 400
/// "Invalid credentials".
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let invalid = || ApiError::bad_request("Invalid credentials");

    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(invalid());
    }

    let user = state
        .stores
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("verify task failed: {}", e)))??;
    if !matches {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id)?;
    Ok(ApiResponse::success(AuthPayload { token, user }))
}
