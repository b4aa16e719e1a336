// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::extract::State;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;

use super::AuthPayload;
use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::NewUser;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};

const AVATAR_COLORS: &[&str] = &[
    "#F44336", "#E91E63", "#9C27B0", "#673AB7", "#3F51B5", "#2196F3", "#03A9F4", "#00BCD4",
    "#009688", "#4CAF50", "#8BC34A", "#CDDC39", "#FFEB3B", "#FFC107", "#FF9800", "#FF5722",
    "#795548", "#9E9E9E", "#607D8B",
];

pub const DEFAULT_AVATAR_COLOR: &str = "#4A9093";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

/// POST /api/auth/register - Create an account and receive a JWT
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<AuthPayload> {
    let (email, password, username) = validate(payload)?;

    if state.stores.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("hashing task failed: {}", e)))??;

    let avatar_color = AVATAR_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_AVATAR_COLOR)
        .to_string();

    let user = state
        .stores
        .users
        .create(
            NewUser {
                email,
                username,
                password_hash,
                avatar_color,
            }
            .into_user(),
        )
        .await?;

    if let Err(e) = state.anchors.seed_defaults(user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "could not seed default anchors");
    }

    let token = state.tokens.issue(user.id)?;
    tracing::info!(user_id = %user.id, "registered new user");

    Ok(ApiResponse::created(AuthPayload { token, user }))
}

fn validate(payload: RegisterRequest) -> Result<(String, String, String), ApiError> {
    let email = payload.email.unwrap_or_default().trim().to_lowercase();
    let password = payload.password.unwrap_or_default();
    let username = payload.username.unwrap_or_default().trim().to_string();

    let mut field_errors = HashMap::new();
    if email.is_empty() {
        field_errors.insert("email".to_string(), "This field is required".to_string());
    } else if !email.contains('@') {
        field_errors.insert("email".to_string(), "Must be a valid email".to_string());
    }
    if password.is_empty() {
        field_errors.insert("password".to_string(), "This field is required".to_string());
    }
    if username.is_empty() {
        field_errors.insert("username".to_string(), "This field is required".to_string());
    }

    if !field_errors.is_empty() {
        return Err(ApiError::validation_error(
            "Missing required fields",
            Some(field_errors),
        ));
    }
    Ok((email, password, username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_missing_field() {
        let err = validate(RegisterRequest {
            email: Some("  ".into()),
            password: None,
            username: Some("sam".into()),
        })
        .unwrap_err();

        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"].get("email").is_some());
        assert!(body["field_errors"].get("password").is_some());
        assert!(body["field_errors"].get("username").is_none());
    }

    #[test]
    fn normalizes_email() {
        let (email, _, _) = validate(RegisterRequest {
            email: Some(" Sam@Example.COM ".into()),
            password: Some("pw".into()),
            username: Some("sam".into()),
        })
        .unwrap();
        assert_eq!(email, "sam@example.com");
    }
}
