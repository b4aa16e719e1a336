// handlers/protected/anchors/create.rs - POST /api/anchors handler

use axum::{extract::State, Extension};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Anchor;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct CreateAnchorRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: String,
}

/// POST /api/anchors - Add a user-created anchor
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateAnchorRequest>,
) -> ApiResult<Anchor> {
    let anchor = state
        .anchors
        .create(auth.user_id, &payload.text, &payload.group)
        .await?;
    Ok(ApiResponse::created(anchor))
}
