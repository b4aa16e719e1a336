// handlers/protected/factors/add.rs - POST /api/factors handler

use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::Value;

use super::{FactorList, DEFAULT_FACTORS};
use crate::app::AppState;
use crate::database::models::User;
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct AddFactorRequest {
    #[serde(default)]
    pub factor: Option<Value>,
}

fn duplicate() -> ApiError {
    ApiError::bad_request("Factor already exists")
}

/// Trimmed factor, or the reason it cannot be added for `user`
fn validate(payload: &AddFactorRequest, user: &User) -> Result<String, ApiError> {
    let factor = match &payload.factor {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(ApiError::bad_request("Factor is required")),
    };

    if DEFAULT_FACTORS.contains(&factor.as_str()) {
        return Err(ApiError::bad_request("Factor already exists in default list"));
    }
    if user.custom_factors.contains(&factor) {
        return Err(duplicate());
    }
    Ok(factor)
}

/// POST /api/factors - Add a custom factor
pub async fn add(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<AddFactorRequest>,
) -> ApiResult<FactorList> {
    let user = current_user(&state, &auth).await?;
    let factor = validate(&payload, &user)?;

    let custom = match state.stores.users.add_custom_factor(user.id, &factor).await {
        Ok(custom) => custom,
        Err(DatabaseError::Conflict(_)) => return Err(duplicate()),
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(user_id = %user.id, "added custom factor");

    Ok(ApiResponse::success(FactorList::with_custom(custom)))
}
