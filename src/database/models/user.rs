use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Account row. Key material (`enc_salt`, `enc_key`) and the password hash
/// are never serialized to clients.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_color: String,
    /// Base64 PBKDF2 salt; set once, never rotated.
    #[serde(skip_serializing)]
    pub enc_salt: Option<String>,
    /// Base64 of the current log key, derived from `(passcode, enc_salt)`.
    #[serde(skip_serializing)]
    pub enc_key: Option<String>,
    pub enc_version: i32,
    /// Contributing factors the user added on top of the defaults.
    pub custom_factors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar_color: String,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            avatar_color: self.avatar_color,
            enc_salt: None,
            enc_key: None,
            enc_version: 1,
            custom_factors: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
