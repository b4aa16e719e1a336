// handlers/protected/passphrase/change.rs - PUT /api/passphrase handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiJson, AuthUser};
use crate::services::PasscodeChange;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseRequest {
    /// Accepted as a JSON string or number
    #[serde(default)]
    pub passcode: Option<Value>,
    #[serde(default)]
    pub client_salt: Option<String>,
}

impl PassphraseRequest {
    fn passcode_text(&self) -> String {
        match &self.passcode {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// PUT /api/passphrase - Store the new key and start re-encrypting logs
///
/// Answers 202 as soon as the job is queued; progress is read from
/// `GET /api/passphrase/status`.
pub async fn change(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(payload): ApiJson<PassphraseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let change = PasscodeChange {
        passcode: payload.passcode_text(),
        client_salt: payload.client_salt,
    };

    let job = state
        .passphrase
        .change_passcode(auth.user_id, change)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "started": true,
            "jobId": job.id
        })),
    ))
}
