// handlers/protected/logs/mood.rs - GET /api/logs/mood handler

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::MoodPoint;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/logs/mood - Plaintext mood series, oldest first. Never decrypts.
pub async fn mood(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<MoodPoint>> {
    let mut points: Vec<MoodPoint> = state
        .stores
        .logs
        .find_by_user(auth.user_id)
        .await?
        .into_iter()
        .filter_map(|doc| {
            doc.mood_score.map(|mood_score| MoodPoint {
                id: doc.id,
                time: doc.time,
                mood_score,
            })
        })
        .collect();
    points.sort_by_key(|p| p.time);

    Ok(ApiResponse::success(points))
}
