// handlers/protected/anchors/list.rs - GET /api/anchors handler

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::Anchor;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/anchors - The caller's anchors, by group then text
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<Anchor>> {
    Ok(ApiResponse::success(state.anchors.list(auth.user_id).await?))
}
