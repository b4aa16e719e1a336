// handlers/protected/anchors/remove.rs - DELETE /api/anchors/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use super::anchor_id;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Serialize)]
pub struct Removed {
    pub id: Uuid,
    pub msg: &'static str,
}

/// DELETE /api/anchors/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Removed> {
    let id = anchor_id(&id)?;
    state.anchors.remove(auth.user_id, id).await?;
    Ok(ApiResponse::success(Removed {
        id,
        msg: "Anchor removed",
    }))
}
