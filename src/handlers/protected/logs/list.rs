// handlers/protected/logs/list.rs - GET /api/logs handler

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::LogView;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::log_codec::{current_key, to_view};

/// GET /api/logs - All of the caller's logs, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<LogView>> {
    let user = current_user(&state, &auth).await?;
    let key = current_key(&user);

    let mut docs = state.stores.logs.find_by_user(user.id).await?;
    docs.sort_by(|a, b| b.time.cmp(&a.time));

    let views = docs.iter().map(|doc| to_view(doc, key.as_ref())).collect();
    Ok(ApiResponse::success(views))
}
