// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects `AuthUser` into request extensions

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::AuthUser;

pub mod anchors;
pub mod auth;
pub mod factors;
pub mod logs;
pub mod passphrase;
pub mod user;

/// Load the account behind a verified token
pub(crate) async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    state
        .stores
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
