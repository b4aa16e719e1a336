use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::{Anchor, MAX_FAVORITES};
use crate::database::{AnchorStore, DatabaseError};

/// Anchors every new account starts with, by group.
pub const DEFAULT_ANCHORS: &[(&str, &[&str])] = &[
    (
        "Breathing",
        &[
            "Breathe in for four, hold for four, out for four",
            "Let my exhale be longer than my inhale",
        ],
    ),
    (
        "Grounding",
        &[
            "Name five things I can see",
            "Feel my feet on the floor",
            "Hold something cold",
        ],
    ),
    (
        "Self-talk",
        &[
            "This feeling will pass",
            "I have handled hard days before",
            "I am allowed to rest",
        ],
    ),
];

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Anchor not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Per-user anchors and the favourites rule.
#[derive(Clone)]
pub struct AnchorService {
    anchors: Arc<dyn AnchorStore>,
}

impl AnchorService {
    pub fn new(anchors: Arc<dyn AnchorStore>) -> Self {
        Self { anchors }
    }

    /// Give the user the default catalogue unless they already have anchors.
    /// Returns how many were added.
    pub async fn seed_defaults(&self, user_id: Uuid) -> Result<usize, AnchorError> {
        if !self.anchors.anchors_for_user(user_id).await?.is_empty() {
            return Ok(0);
        }

        let seeded: Vec<Anchor> = DEFAULT_ANCHORS
            .iter()
            .flat_map(|(group, texts)| {
                texts
                    .iter()
                    .map(move |text| Anchor::new(user_id, text, group, false))
            })
            .collect();
        let count = seeded.len();
        self.anchors.insert_anchors(seeded).await?;

        info!(user_id = %user_id, count, "seeded default anchors");
        Ok(count)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Anchor>, AnchorError> {
        Ok(self.anchors.anchors_for_user(user_id).await?)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        text: &str,
        group: &str,
    ) -> Result<Anchor, AnchorError> {
        let text = text.trim();
        let group = group.trim();
        if text.is_empty() {
            return Err(AnchorError::MissingField("text"));
        }
        if group.is_empty() {
            return Err(AnchorError::MissingField("group"));
        }

        let anchor = Anchor::new(user_id, text, group, true);
        self.anchors.insert_anchors(vec![anchor.clone()]).await?;
        Ok(anchor)
    }

    pub async fn remove(&self, user_id: Uuid, id: Uuid) -> Result<(), AnchorError> {
        let anchor = self.owned(user_id, id).await?;
        if !self.anchors.delete_anchor(anchor.id).await? {
            return Err(AnchorError::NotFound);
        }
        Ok(())
    }

    /// Flip an anchor's favourite flag. Favouriting when the user already
    /// has `MAX_FAVORITES` unfavourites the lowest-ranked one first.
    pub async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Anchor, AnchorError> {
        let mut anchor = self.owned(user_id, id).await?;

        if anchor.is_favorite {
            anchor.unfavorite();
            self.anchors.save_anchor(&anchor).await?;
            return Ok(anchor);
        }

        let favorites: Vec<Anchor> = self
            .anchors
            .anchors_for_user(user_id)
            .await?
            .into_iter()
            .filter(|a| a.is_favorite)
            .collect();

        let next_rank = favorites
            .iter()
            .filter_map(|a| a.favorite_rank)
            .max()
            .map_or(0, |rank| rank + 1)
            .max(Utc::now().timestamp_millis());

        if favorites.len() >= MAX_FAVORITES {
            if let Some(mut oldest) = favorites.into_iter().min_by_key(|a| a.favorite_rank) {
                debug!(anchor_id = %oldest.id, "evicting oldest favourite");
                oldest.unfavorite();
                self.anchors.save_anchor(&oldest).await?;
            }
        }

        anchor.favorite(next_rank);
        self.anchors.save_anchor(&anchor).await?;
        Ok(anchor)
    }

    /// Anchors owned by someone else look missing.
    async fn owned(&self, user_id: Uuid, id: Uuid) -> Result<Anchor, AnchorError> {
        match self.anchors.find_anchor(id).await? {
            Some(anchor) if anchor.user_id == user_id => Ok(anchor),
            _ => Err(AnchorError::NotFound),
        }
    }
}
