// handlers/protected/user/avatar.rs - PUT /api/user/avatar handler

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::User;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};

const MAX_COLOR_NAME: usize = 32;

#[derive(Debug, Default, Deserialize)]
pub struct AvatarRequest {
    #[serde(default)]
    pub color: Option<String>,
}

/// `#RGB`, `#RRGGBB`, or a plain colour name such as `teal`
fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => {
            !color.is_empty()
                && color.len() <= MAX_COLOR_NAME
                && color.chars().all(|c| c.is_ascii_alphabetic())
        }
    }
}

/// PUT /api/user/avatar - Change the caller's avatar colour
pub async fn avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<AvatarRequest>,
) -> ApiResult<User> {
    let color = payload.color.unwrap_or_default().trim().to_string();
    if color.is_empty() {
        return Err(ApiError::invalid_field("color", "Color is required"));
    }
    if !is_valid_color(&color) {
        return Err(ApiError::invalid_field("color", "Invalid color format"));
    }

    let user = state
        .stores
        .users
        .set_avatar_color(auth.user_id, &color)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(_) => ApiError::not_found("User not found"),
            other => other.into(),
        })?;

    Ok(ApiResponse::success(user))
}
