// handlers/protected/factors/list.rs - GET /api/factors handler

use axum::{extract::State, Extension};

use super::FactorList;
use crate::app::AppState;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/factors - Default factors and the caller's own
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<FactorList> {
    let user = current_user(&state, &auth).await?;
    Ok(ApiResponse::success(FactorList::with_custom(user.custom_factors)))
}
