// handlers/protected/logs/record.rs - GET|DELETE /api/logs/:id handlers

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use super::owned_log;
use crate::app::AppState;
use crate::database::models::LogView;
use crate::error::ApiError;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::log_codec::{current_key, to_view};

#[derive(Debug, Serialize)]
pub struct Removed {
    pub id: Uuid,
    pub msg: &'static str,
}

/// GET /api/logs/:id
pub async fn get_one(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<LogView> {
    let doc = owned_log(&state, &auth, &id).await?;
    let user = current_user(&state, &auth).await?;
    Ok(ApiResponse::success(to_view(&doc, current_key(&user).as_ref())))
}

/// DELETE /api/logs/:id
pub async fn delete_one(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Removed> {
    let doc = owned_log(&state, &auth, &id).await?;

    if !state.stores.logs.delete(doc.id).await? {
        return Err(ApiError::not_found("Log not found"));
    }

    Ok(ApiResponse::success(Removed {
        id: doc.id,
        msg: "Log removed",
    }))
}
