// handlers/protected/anchors/mod.rs - Grounding anchor endpoints
//
// Every account is seeded with a default catalogue at registration; users
// can add their own and keep up to three favourites.

use uuid::Uuid;

use crate::error::ApiError;

mod create;   // POST /api/anchors
mod favorite; // POST /api/anchors/:id/toggle-favorite
mod list;     // GET /api/anchors
mod remove;   // DELETE /api/anchors/:id

pub use create::create;
pub use favorite::toggle_favorite;
pub use list::list;
pub use remove::remove;

fn anchor_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Anchor not found"))
}
