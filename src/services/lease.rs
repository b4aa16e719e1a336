use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Registry of users with a re-encryption job in flight.
///
/// Process-local: one API instance per database is assumed.
#[derive(Clone, Default)]
pub struct MigrationLocks {
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl MigrationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the user already holds a lease.
    pub fn try_acquire(&self, user_id: Uuid) -> Option<MigrationLease> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(user_id) {
            return None;
        }
        Some(MigrationLease {
            user_id,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, user_id: Uuid) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&user_id)
    }
}

/// Released on drop, including when the owning task panics.
#[derive(Debug)]
pub struct MigrationLease {
    user_id: Uuid,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl MigrationLease {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl Drop for MigrationLease {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}
