use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Anchor, LogDocument, PassphraseJob, User};
use super::{AnchorStore, DatabaseError, JobStore, LogStore, UserStore};

/// In-process store used when no `DATABASE_URL` is configured, and by tests.
///
/// Rows live in insertion order, which is the "natural order" reported by
/// `find_by_user`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    logs: RwLock<Vec<LogDocument>>,
    jobs: RwLock<Vec<PassphraseJob>>,
    anchors: RwLock<Vec<Anchor>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: User) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::Conflict(format!(
                "user with email {} already exists",
                user.email
            )));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn ensure_salt(&self, id: Uuid, candidate: &str) -> Result<String, DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        Ok(user
            .enc_salt
            .get_or_insert_with(|| candidate.to_string())
            .clone())
    }

    async fn set_key(
        &self,
        id: Uuid,
        key_b64: &str,
        enc_version: i32,
    ) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.enc_key = Some(key_b64.to_string());
        user.enc_version = enc_version;
        Ok(())
    }

    async fn add_custom_factor(
        &self,
        id: Uuid,
        factor: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        if user.custom_factors.iter().any(|f| f == factor) {
            return Err(DatabaseError::Conflict(format!("factor {} already exists", factor)));
        }
        user.custom_factors.push(factor.to_string());
        Ok(user.custom_factors.clone())
    }

    async fn set_avatar_color(&self, id: Uuid, color: &str) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.avatar_color = color.to_string();
        Ok(user.clone())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert(&self, doc: LogDocument) -> Result<LogDocument, DatabaseError> {
        let mut logs = self.logs.write().await;
        if logs.iter().any(|l| l.id == doc.id) {
            return Err(DatabaseError::Conflict(format!("log {} already exists", doc.id)));
        }
        logs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogDocument>, DatabaseError> {
        Ok(self.logs.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<LogDocument>, DatabaseError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, doc: &LogDocument) -> Result<(), DatabaseError> {
        let mut logs = self.logs.write().await;
        let slot = logs
            .iter_mut()
            .find(|l| l.id == doc.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("log {}", doc.id)))?;
        *slot = doc.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut logs = self.logs.write().await;
        let before = logs.len();
        logs.retain(|l| l.id != id);
        Ok(logs.len() != before)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: PassphraseJob) -> Result<PassphraseJob, DatabaseError> {
        self.jobs.write().await.push(job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PassphraseJob>, DatabaseError> {
        Ok(self.jobs.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn save(&self, job: &PassphraseJob) -> Result<(), DatabaseError> {
        let mut jobs = self.jobs.write().await;
        let slot = jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("passphrase job {}", job.id)))?;
        *slot = job.clone();
        Ok(())
    }

    async fn latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PassphraseJob>, DatabaseError> {
        // max_by_key keeps the last of equal maxima, so same-instant jobs
        // resolve to the one inserted last
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| j.user_id == user_id)
            .max_by_key(|j| j.created_at)
            .cloned())
    }
}

#[async_trait]
impl AnchorStore for MemoryStore {
    async fn insert_anchors(&self, anchors: Vec<Anchor>) -> Result<(), DatabaseError> {
        self.anchors.write().await.extend(anchors);
        Ok(())
    }

    async fn anchors_for_user(&self, user_id: Uuid) -> Result<Vec<Anchor>, DatabaseError> {
        let mut anchors: Vec<Anchor> = self
            .anchors
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        anchors.sort_by(|a, b| (&a.group, &a.text).cmp(&(&b.group, &b.text)));
        Ok(anchors)
    }

    async fn find_anchor(&self, id: Uuid) -> Result<Option<Anchor>, DatabaseError> {
        Ok(self.anchors.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn save_anchor(&self, anchor: &Anchor) -> Result<(), DatabaseError> {
        let mut anchors = self.anchors.write().await;
        let slot = anchors
            .iter_mut()
            .find(|a| a.id == anchor.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("anchor {}", anchor.id)))?;
        *slot = anchor.clone();
        Ok(())
    }

    async fn delete_anchor(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut anchors = self.anchors.write().await;
        let before = anchors.len();
        anchors.retain(|a| a.id != id);
        Ok(anchors.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{JobState, NewUser};
    use chrono::{Duration, Utc};

    fn new_user(email: &str) -> User {
        NewUser {
            email: email.into(),
            username: "tester".into(),
            password_hash: "hash".into(),
            avatar_color: "#4A9093".into(),
        }
        .into_user()
    }

    fn legacy_log(user_id: Uuid, emotion: &str) -> LogDocument {
        LogDocument {
            id: Uuid::new_v4(),
            user_id,
            time: Utc::now(),
            cipher: None,
            mood_score: Some(5),
            trigger: String::new(),
            emotion: emotion.into(),
            intensity: Some(5),
            anchor: String::new(),
            contributing: Vec::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let store = MemoryStore::new();
        UserStore::create(&store, new_user("a@example.com")).await.unwrap();
        let err = UserStore::create(&store, new_user("A@example.com")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn salt_is_only_set_once() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, new_user("a@example.com")).await.unwrap();

        let first = store.ensure_salt(user.id, "first").await.unwrap();
        let second = store.ensure_salt(user.id, "second").await.unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "first");
    }

    #[tokio::test]
    async fn custom_factors_are_unique_per_user() {
        let store = MemoryStore::new();
        let user = UserStore::create(&store, new_user("a@example.com")).await.unwrap();

        assert_eq!(store.add_custom_factor(user.id, "Rested").await.unwrap(), ["Rested"]);
        assert_eq!(
            store.add_custom_factor(user.id, "Hungry").await.unwrap(),
            ["Rested", "Hungry"]
        );
        assert!(matches!(
            store.add_custom_factor(user.id, "Rested").await,
            Err(DatabaseError::Conflict(_))
        ));
        assert!(matches!(
            store.add_custom_factor(Uuid::new_v4(), "Rested").await,
            Err(DatabaseError::NotFound(_))
        ));

        let updated = store.set_avatar_color(user.id, "#123ABC").await.unwrap();
        assert_eq!(updated.avatar_color, "#123ABC");
        assert_eq!(updated.custom_factors.len(), 2);
    }

    #[tokio::test]
    async fn anchors_are_scoped_and_sorted_by_group_then_text() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store
            .insert_anchors(vec![
                Anchor::new(user, "b", "Breathing", false),
                Anchor::new(user, "a", "Self-talk", false),
                Anchor::new(user, "a", "Breathing", false),
                Anchor::new(Uuid::new_v4(), "other", "Breathing", false),
            ])
            .await
            .unwrap();

        let anchors = store.anchors_for_user(user).await.unwrap();
        let keys: Vec<(&str, &str)> = anchors
            .iter()
            .map(|a| (a.group.as_str(), a.text.as_str()))
            .collect();
        assert_eq!(keys, [("Breathing", "a"), ("Breathing", "b"), ("Self-talk", "a")]);

        let mut first = anchors[0].clone();
        first.favorite(1);
        store.save_anchor(&first).await.unwrap();
        assert_eq!(store.find_anchor(first.id).await.unwrap(), Some(first.clone()));

        assert!(store.delete_anchor(first.id).await.unwrap());
        assert!(!store.delete_anchor(first.id).await.unwrap());
        assert!(matches!(
            store.save_anchor(&first).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn logs_are_scoped_and_ordered_by_insertion() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for emotion in ["one", "two", "three"] {
            store.insert(legacy_log(alice, emotion)).await.unwrap();
        }
        store.insert(legacy_log(bob, "other")).await.unwrap();

        let logs = store.find_by_user(alice).await.unwrap();
        let emotions: Vec<&str> = logs.iter().map(|l| l.emotion.as_str()).collect();
        assert_eq!(emotions, ["one", "two", "three"]);
        assert_eq!(store.find_by_user(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn saving_a_deleted_log_fails() {
        let store = MemoryStore::new();
        let doc = store.insert(legacy_log(Uuid::new_v4(), "x")).await.unwrap();

        assert!(store.delete(doc.id).await.unwrap());
        assert!(!store.delete(doc.id).await.unwrap());
        assert!(matches!(
            LogStore::save(&store, &doc).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn latest_job_is_newest_by_creation_time() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let mut older = PassphraseJob::pending(user, 1);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = PassphraseJob::pending(user, 1);

        JobStore::create(&store, newer.clone()).await.unwrap();
        JobStore::create(&store, older).await.unwrap();
        JobStore::create(&store, PassphraseJob::pending(Uuid::new_v4(), 1))
            .await
            .unwrap();

        let latest = store.latest_for_user(user).await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
        assert_eq!(latest.state, JobState::Pending);
        assert!(store.latest_for_user(Uuid::new_v4()).await.unwrap().is_none());
    }
}
