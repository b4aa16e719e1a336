// handlers/protected/logs/create.rs - POST /api/logs handler

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::app::AppState;
use crate::database::models::{LogPlaintext, LogView, DEFAULT_INTENSITY};
use crate::error::ApiError;
use crate::handlers::protected::current_user;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::log_codec::{current_key, to_view, write_plain};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub emotion: String,
    pub intensity: Option<i32>,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub contributing: Vec<String>,
    pub mood_score: Option<i32>,
    pub time: Option<DateTime<Utc>>,
}

impl CreateLogRequest {
    fn into_plaintext(self) -> Result<LogPlaintext, ApiError> {
        let mut field_errors = HashMap::new();
        for (field, value) in [("intensity", self.intensity), ("moodScore", self.mood_score)] {
            if matches!(value, Some(v) if !(1..=10).contains(&v)) {
                field_errors.insert(field.to_string(), "Must be between 1 and 10".to_string());
            }
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Invalid log", Some(field_errors)));
        }

        Ok(LogPlaintext {
            trigger: self.trigger,
            emotion: self.emotion,
            intensity: self.intensity.unwrap_or(DEFAULT_INTENSITY),
            anchor: self.anchor,
            contributing: self.contributing,
            time: self.time,
            mood_score: self.mood_score,
        })
    }
}

/// POST /api/logs - Record a log, encrypted at rest when the user has a key
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreateLogRequest>,
) -> ApiResult<LogView> {
    let plain = payload.into_plaintext()?;
    let user = current_user(&state, &auth).await?;
    let key = current_key(&user);

    let doc = write_plain(plain, user.id, key.as_ref())?;
    let doc = state.stores.logs.insert(doc).await?;

    Ok(ApiResponse::created(to_view(&doc, key.as_ref())))
}
