//! Persistence collaborators.
//!
//! The services only see the `UserStore`, `LogStore`, `JobStore` and
//! `AnchorStore` traits.
//! `MemoryStore` backs development and tests; `PgStore` backs production.
//! Neither offers transactions across records.

pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use models::{Anchor, LogDocument, PassphraseJob, User};

/// Errors from any store backend
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. Fails with `Conflict` on a duplicate email.
    async fn create(&self, user: User) -> Result<User, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Store `candidate` as the user's salt unless one already exists, and
    /// return whichever salt is now in effect.
    async fn ensure_salt(&self, id: Uuid, candidate: &str) -> Result<String, DatabaseError>;

    /// Overwrite the user's current key and envelope version.
    async fn set_key(&self, id: Uuid, key_b64: &str, enc_version: i32)
        -> Result<(), DatabaseError>;

    /// Append `factor` to the user's custom factors and return the list.
    /// Fails with `Conflict` if it is already there.
    async fn add_custom_factor(&self, id: Uuid, factor: &str)
        -> Result<Vec<String>, DatabaseError>;

    async fn set_avatar_color(&self, id: Uuid, color: &str) -> Result<User, DatabaseError>;

    /// Liveness check used by `/api/health`.
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert(&self, doc: LogDocument) -> Result<LogDocument, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogDocument>, DatabaseError>;

    /// Every log owned by `user_id`, in the backend's natural order.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<LogDocument>, DatabaseError>;

    /// Replace an existing log. Fails with `NotFound` if it was deleted.
    async fn save(&self, doc: &LogDocument) -> Result<(), DatabaseError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: PassphraseJob) -> Result<PassphraseJob, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PassphraseJob>, DatabaseError>;

    async fn save(&self, job: &PassphraseJob) -> Result<(), DatabaseError>;

    /// Most recently created job for `user_id`.
    async fn latest_for_user(&self, user_id: Uuid)
        -> Result<Option<PassphraseJob>, DatabaseError>;
}

#[async_trait]
pub trait AnchorStore: Send + Sync {
    async fn insert_anchors(&self, anchors: Vec<Anchor>) -> Result<(), DatabaseError>;

    /// The user's anchors ordered by group, then text.
    async fn anchors_for_user(&self, user_id: Uuid) -> Result<Vec<Anchor>, DatabaseError>;

    async fn find_anchor(&self, id: Uuid) -> Result<Option<Anchor>, DatabaseError>;

    async fn save_anchor(&self, anchor: &Anchor) -> Result<(), DatabaseError>;

    /// Returns whether a row was removed.
    async fn delete_anchor(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// The stores the application needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub logs: Arc<dyn LogStore>,
    pub jobs: Arc<dyn JobStore>,
    pub anchors: Arc<dyn AnchorStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::default()))
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + LogStore + JobStore + AnchorStore + 'static,
    {
        Self {
            users: backend.clone(),
            logs: backend.clone(),
            jobs: backend.clone(),
            anchors: backend,
        }
    }
}
