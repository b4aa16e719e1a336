// handlers/protected/anchors/favorite.rs - POST /api/anchors/:id/toggle-favorite handler

use axum::{
    extract::{Path, State},
    Extension,
};

use super::anchor_id;
use crate::app::AppState;
use crate::database::models::Anchor;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// POST /api/anchors/:id/toggle-favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Anchor> {
    let anchor = state
        .anchors
        .toggle_favorite(auth.user_id, anchor_id(&id)?)
        .await?;
    Ok(ApiResponse::success(anchor))
}
