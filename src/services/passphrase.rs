use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::lease::MigrationLocks;
use super::ledger::JobLedger;
use super::log_codec::current_key;
use super::migration::{KeyChange, MigrationEngine};
use crate::crypto::{derive_key, generate_salt, validate_passcode, validate_salt, CryptoError};
use crate::database::models::PassphraseJob;
use crate::database::{DatabaseError, Stores, UserStore};

#[derive(Debug, Error)]
pub enum PassphraseError {
    #[error("Invalid passcode format")]
    InvalidPasscode,

    #[error("Invalid clientSalt")]
    InvalidClientSalt,

    #[error("User not found")]
    UserNotFound,

    #[error("A passcode change is already in progress")]
    MigrationInProgress,

    #[error("Key derivation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Key derivation task failed: {0}")]
    Derivation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Request to move a user's logs to a new passcode.
#[derive(Debug, Clone)]
pub struct PasscodeChange {
    pub passcode: String,
    /// Salt the client used for its own encryption, if any. Logs sealed
    /// with `derive(passcode, client_salt)` are carried over.
    pub client_salt: Option<String>,
}

/// Entry point for passcode changes and their status.
#[derive(Clone)]
pub struct PassphraseService {
    users: Arc<dyn UserStore>,
    ledger: JobLedger,
    engine: MigrationEngine,
    locks: MigrationLocks,
}

impl PassphraseService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            users: stores.users.clone(),
            ledger: JobLedger::new(stores.jobs.clone()),
            engine: MigrationEngine::new(stores.logs.clone(), stores.jobs.clone()),
            locks: MigrationLocks::new(),
        }
    }

    pub fn locks(&self) -> &MigrationLocks {
        &self.locks
    }

    /// Install the new key and start re-encrypting in the background.
    ///
    /// Opens the `pending` job, then stores the key and returns. If either
    /// write fails the stored key is unchanged. The engine keeps the user's
    /// lease until the job is terminal.
    pub async fn change_passcode(
        &self,
        user_id: Uuid,
        change: PasscodeChange,
    ) -> Result<PassphraseJob, PassphraseError> {
        let passcode =
            validate_passcode(&change.passcode).map_err(|_| PassphraseError::InvalidPasscode)?;

        let client_salt = match change.client_salt.as_deref().map(str::trim) {
            Some(salt) if !salt.is_empty() => {
                validate_salt(salt).map_err(|_| PassphraseError::InvalidClientSalt)?;
                Some(salt.to_string())
            }
            _ => None,
        };

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(PassphraseError::UserNotFound)?;

        let lease = self
            .locks
            .try_acquire(user.id)
            .ok_or(PassphraseError::MigrationInProgress)?;

        let salt = match user.enc_salt.clone() {
            Some(salt) => salt,
            None => self.users.ensure_salt(user.id, &generate_salt()).await?,
        };
        let previous_key = current_key(&user);

        let (new_key, client_key) = tokio::task::spawn_blocking(move || {
            let new_key = derive_key(&passcode, &salt)?;
            let client_key = client_salt
                .as_deref()
                .map(|s| derive_key(&passcode, s))
                .transpose()?;
            Ok::<_, CryptoError>((new_key, client_key))
        })
        .await
        .map_err(|e| PassphraseError::Derivation(e.to_string()))??;

        // The job must exist before the old key is overwritten; after that
        // only the engine holds the previous key.
        let job = self.ledger.open(user.id, user.enc_version).await?;

        if let Err(e) = self
            .users
            .set_key(user.id, &new_key.to_base64(), user.enc_version)
            .await
        {
            self.engine
                .mark_failed(job.id, &format!("could not store new key: {}", e))
                .await;
            return Err(e.into());
        }
        info!(job_id = %job.id, user_id = %user.id, "passcode changed, re-encryption queued");

        let keys = KeyChange::new(previous_key.into_iter().chain(client_key), new_key);
        self.engine.spawn(job.id, user.id, keys, lease);

        Ok(job)
    }

    /// The user's latest job, if any.
    pub async fn status(&self, user_id: Uuid) -> Result<Option<PassphraseJob>, PassphraseError> {
        Ok(self.ledger.latest(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt_json, SymmetricKey};
    use crate::database::models::{JobState, LogPlaintext, NewUser, User};
    use crate::database::{JobStore, MemoryStore};
    use crate::services::log_codec::write_plain;
    use async_trait::async_trait;
    use std::time::Duration;

    fn new_user() -> User {
        NewUser {
            email: "sam@example.com".into(),
            username: "sam".into(),
            password_hash: "x".into(),
            avatar_color: "#4A9093".into(),
        }
        .into_user()
    }

    async fn setup() -> (Stores, PassphraseService, User) {
        let stores = Stores::memory();
        let service = PassphraseService::new(&stores);
        let user = stores.users.create(new_user()).await.unwrap();
        (stores, service, user)
    }

    /// Job store that cannot create jobs
    struct RefusingJobs(MemoryStore);

    #[async_trait]
    impl JobStore for RefusingJobs {
        async fn create(&self, _job: PassphraseJob) -> Result<PassphraseJob, DatabaseError> {
            Err(DatabaseError::Corrupt("job table unavailable".into()))
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<PassphraseJob>, DatabaseError> {
            JobStore::find_by_id(&self.0, id).await
        }

        async fn save(&self, job: &PassphraseJob) -> Result<(), DatabaseError> {
            JobStore::save(&self.0, job).await
        }

        async fn latest_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Option<PassphraseJob>, DatabaseError> {
            self.0.latest_for_user(user_id).await
        }
    }

    /// User store whose key column cannot be written
    struct KeyLockedUsers(Arc<MemoryStore>);

    #[async_trait]
    impl UserStore for KeyLockedUsers {
        async fn create(&self, user: User) -> Result<User, DatabaseError> {
            UserStore::create(self.0.as_ref(), user).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
            UserStore::find_by_id(self.0.as_ref(), id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
            self.0.find_by_email(email).await
        }

        async fn ensure_salt(&self, id: Uuid, candidate: &str) -> Result<String, DatabaseError> {
            self.0.ensure_salt(id, candidate).await
        }

        async fn set_key(&self, _id: Uuid, _key: &str, _v: i32) -> Result<(), DatabaseError> {
            Err(DatabaseError::Corrupt("users table is read-only".into()))
        }

        async fn add_custom_factor(
            &self,
            id: Uuid,
            factor: &str,
        ) -> Result<Vec<String>, DatabaseError> {
            self.0.add_custom_factor(id, factor).await
        }

        async fn set_avatar_color(&self, id: Uuid, color: &str) -> Result<User, DatabaseError> {
            self.0.set_avatar_color(id, color).await
        }
    }

    async fn seed_logs(stores: &Stores, user_id: Uuid, count: usize, key: Option<&SymmetricKey>) {
        for i in 0..count {
            let plain = LogPlaintext {
                emotion: format!("feeling {}", i),
                ..LogPlaintext::default()
            };
            stores
                .logs
                .insert(write_plain(plain, user_id, key).unwrap())
                .await
                .unwrap();
        }
    }

    async fn wait_for_terminal(service: &PassphraseService, user_id: Uuid) -> PassphraseJob {
        for _ in 0..200 {
            if let Some(job) = service.status(user_id).await.unwrap() {
                if job.state.is_terminal() && !service.locks().is_active(user_id) {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("migration did not finish");
    }

    fn change(passcode: &str, client_salt: Option<&str>) -> PasscodeChange {
        PasscodeChange {
            passcode: passcode.into(),
            client_salt: client_salt.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn first_change_encrypts_legacy_logs_and_stores_key_material() {
        let (stores, service, user) = setup().await;
        seed_logs(&stores, user.id, 3, None).await;

        let job = service.change_passcode(user.id, change(" 1234 ", None)).await.unwrap();
        assert_eq!(job.state, JobState::Pending);

        let done = wait_for_terminal(&service, user.id).await;
        assert_eq!(done.id, job.id);
        assert_eq!(done.state, JobState::Completed);
        assert_eq!((done.total, done.processed, done.skipped, done.errors), (3, 3, 0, 0));

        let stored = stores.users.find_by_id(user.id).await.unwrap().unwrap();
        let salt = stored.enc_salt.clone().unwrap();
        let expected = derive_key(&validate_passcode("1234").unwrap(), &salt).unwrap();
        assert_eq!(current_key(&stored), Some(expected.clone()));

        for doc in stores.logs.find_by_user(user.id).await.unwrap() {
            let plain: LogPlaintext = decrypt_json(doc.cipher.as_ref().unwrap(), &expected).unwrap();
            assert!(plain.emotion.starts_with("feeling"));
        }
    }

    #[tokio::test]
    async fn repeating_the_same_passcode_skips_everything() {
        let (stores, service, user) = setup().await;
        seed_logs(&stores, user.id, 2, None).await;

        service.change_passcode(user.id, change("1234", None)).await.unwrap();
        wait_for_terminal(&service, user.id).await;
        let salt_before = stores.users.find_by_id(user.id).await.unwrap().unwrap().enc_salt;

        service.change_passcode(user.id, change("1234", None)).await.unwrap();
        let again = wait_for_terminal(&service, user.id).await;
        assert_eq!((again.processed, again.skipped), (0, 2));

        let salt_after = stores.users.find_by_id(user.id).await.unwrap().unwrap().enc_salt;
        assert_eq!(salt_before, salt_after);
    }

    #[tokio::test]
    async fn new_passcode_moves_logs_from_the_previous_key() {
        let (stores, service, user) = setup().await;
        seed_logs(&stores, user.id, 2, None).await;

        service.change_passcode(user.id, change("1234", None)).await.unwrap();
        wait_for_terminal(&service, user.id).await;

        service.change_passcode(user.id, change("5678", None)).await.unwrap();
        let moved = wait_for_terminal(&service, user.id).await;
        assert_eq!((moved.processed, moved.skipped), (2, 0));

        let stored = stores.users.find_by_id(user.id).await.unwrap().unwrap();
        let key = current_key(&stored).unwrap();
        for doc in stores.logs.find_by_user(user.id).await.unwrap() {
            assert!(decrypt_json::<LogPlaintext>(doc.cipher.as_ref().unwrap(), &key).is_ok());
        }
    }

    #[tokio::test]
    async fn client_salt_key_unlocks_client_encrypted_logs() {
        let (stores, service, user) = setup().await;
        let client_key = derive_key(&validate_passcode("1234").unwrap(), "AAAA").unwrap();
        seed_logs(&stores, user.id, 2, Some(&client_key)).await;

        service
            .change_passcode(user.id, change("1234", Some("AAAA")))
            .await
            .unwrap();
        let done = wait_for_terminal(&service, user.id).await;
        assert_eq!((done.processed, done.skipped), (2, 0));
    }

    #[tokio::test]
    async fn rejects_bad_input_before_touching_the_user() {
        let (stores, service, user) = setup().await;

        for bad in ["12a4", "12345", ""] {
            assert!(matches!(
                service.change_passcode(user.id, change(bad, None)).await,
                Err(PassphraseError::InvalidPasscode)
            ));
        }
        assert!(matches!(
            service.change_passcode(user.id, change("1234", Some("%%%"))).await,
            Err(PassphraseError::InvalidClientSalt)
        ));
        assert!(matches!(
            service.change_passcode(Uuid::new_v4(), change("1234", None)).await,
            Err(PassphraseError::UserNotFound)
        ));

        let untouched = stores.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(untouched.enc_salt.is_none());
        assert!(service.status(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_change_is_refused() {
        let (_stores, service, user) = setup().await;
        let _held = service.locks().try_acquire(user.id).unwrap();

        assert!(matches!(
            service.change_passcode(user.id, change("1234", None)).await,
            Err(PassphraseError::MigrationInProgress)
        ));
        assert!(service.status(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_job_creation_keeps_the_previous_key() {
        let backend = Arc::new(MemoryStore::new());
        let stores = Stores {
            users: backend.clone(),
            logs: backend.clone(),
            jobs: Arc::new(RefusingJobs(MemoryStore::new())),
            anchors: backend.clone(),
        };
        let service = PassphraseService::new(&stores);
        let user = stores.users.create(new_user()).await.unwrap();

        let old_key = SymmetricKey::generate();
        stores
            .users
            .set_key(user.id, &old_key.to_base64(), user.enc_version)
            .await
            .unwrap();
        seed_logs(&stores, user.id, 1, Some(&old_key)).await;

        let result = service.change_passcode(user.id, change("1234", None)).await;
        assert!(matches!(result, Err(PassphraseError::Database(_))));

        let stored = stores.users.find_by_id(user.id).await.unwrap().unwrap();
        let key = current_key(&stored).unwrap();
        assert_eq!(key, old_key);
        for doc in stores.logs.find_by_user(user.id).await.unwrap() {
            assert!(decrypt_json::<LogPlaintext>(doc.cipher.as_ref().unwrap(), &key).is_ok());
        }
        assert!(!service.locks().is_active(user.id));
    }

    #[tokio::test]
    async fn failed_key_write_fails_the_job() {
        let backend = Arc::new(MemoryStore::new());
        let stores = Stores {
            users: Arc::new(KeyLockedUsers(backend.clone())),
            logs: backend.clone(),
            jobs: backend.clone(),
            anchors: backend.clone(),
        };
        let service = PassphraseService::new(&stores);
        let user = stores.users.create(new_user()).await.unwrap();
        seed_logs(&stores, user.id, 2, None).await;

        let result = service.change_passcode(user.id, change("1234", None)).await;
        assert!(matches!(result, Err(PassphraseError::Database(_))));

        let job = service.status(user.id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job
            .last_error
            .as_deref()
            .is_some_and(|e| e.starts_with("could not store new key")));

        let stored = stores.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.enc_key.is_none());
        for doc in stores.logs.find_by_user(user.id).await.unwrap() {
            assert!(!doc.is_encrypted());
        }
        assert!(!service.locks().is_active(user.id));
    }
}
