// handlers/protected/logs/mod.rs - Emotion log endpoints
//
// Handlers speak plaintext; encryption at rest goes through
// `services::log_codec` with the caller's current key.

use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::LogDocument;
use crate::error::ApiError;
use crate::middleware::AuthUser;

mod create; // POST /api/logs
mod list;   // GET /api/logs
mod mood;   // GET /api/logs/mood
mod record; // GET|DELETE /api/logs/:id

pub use create::create;
pub use list::list;
pub use mood::mood;
pub use record::{delete_one, get_one};

/// Fetch a log and check that the caller owns it
async fn owned_log(state: &AppState, auth: &AuthUser, id: &str) -> Result<LogDocument, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::not_found("Log not found"))?;

    let doc = state
        .stores
        .logs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Log not found"))?;

    if doc.user_id != auth.user_id {
        return Err(ApiError::unauthorized("Not authorized"));
    }
    Ok(doc)
}
