// handlers/protected/auth/me.rs - GET /api/auth/me handler

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::User;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/me - Profile of the token's owner, without secrets
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<User> {
    let user = current_user(&state, &auth).await?;
    Ok(ApiResponse::success(user))
}
