use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Favourites a user can hold at once. Favouriting one more evicts the
/// lowest-ranked.
pub const MAX_FAVORITES: usize = 3;

/// A grounding phrase the user can attach to logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    #[sqlx(rename = "group_name")]
    pub group: String,
    pub is_favorite: bool,
    /// Higher is newer; `None` unless favourited.
    pub favorite_rank: Option<i64>,
    pub is_user_created: bool,
}

impl Anchor {
    pub fn new(user_id: Uuid, text: &str, group: &str, is_user_created: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            text: text.to_string(),
            group: group.to_string(),
            is_favorite: false,
            favorite_rank: None,
            is_user_created,
        }
    }

    pub fn favorite(&mut self, rank: i64) {
        self.is_favorite = true;
        self.favorite_rank = Some(rank);
    }

    pub fn unfavorite(&mut self) {
        self.is_favorite = false;
        self.favorite_rank = None;
    }
}
