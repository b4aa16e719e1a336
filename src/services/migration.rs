//! Background re-encryption of a user's logs after a passcode change.
//!
//! Records are visited one by one in storage order. Each one either gets
//! re-sealed under the new key (`processed`), is left untouched (`skipped`),
//! or fails for an unexpected reason (`errors`). The job row is saved after
//! every record so `/api/passphrase/status` can report progress.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::lease::MigrationLease;
use super::log_codec::{legacy_plain, seal};
use crate::crypto::{decrypt_json, CryptoError, SymmetricKey};
use crate::database::models::{LogDocument, PassphraseJob};
use crate::database::{DatabaseError, JobStore, LogStore};

/// Errors that abort a whole job
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("passphrase job {0} not found")]
    JobNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Errors confined to a single record; counted, never propagated
#[derive(Debug, Error)]
enum RecordError {
    #[error("encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

enum Outcome {
    Reencrypted,
    Skipped,
}

/// Keys involved in one passcode change.
///
/// `old_keys` are tried in order against each encrypted record. Any
/// candidate equal to the new key is dropped, so records already under the
/// new key count as skipped rather than being rewritten.
pub struct KeyChange {
    old_keys: Vec<SymmetricKey>,
    new_key: SymmetricKey,
}

impl KeyChange {
    pub fn new<I>(old_keys: I, new_key: SymmetricKey) -> Self
    where
        I: IntoIterator<Item = SymmetricKey>,
    {
        let mut unique: Vec<SymmetricKey> = Vec::new();
        for key in old_keys {
            if key != new_key && !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self {
            old_keys: unique,
            new_key,
        }
    }

    pub fn old_keys(&self) -> &[SymmetricKey] {
        &self.old_keys
    }

    pub fn new_key(&self) -> &SymmetricKey {
        &self.new_key
    }
}

#[derive(Clone)]
pub struct MigrationEngine {
    logs: Arc<dyn LogStore>,
    jobs: Arc<dyn JobStore>,
}

impl MigrationEngine {
    pub fn new(logs: Arc<dyn LogStore>, jobs: Arc<dyn JobStore>) -> Self {
        Self { logs, jobs }
    }

    /// Drive job `job_id` to `completed`. Returns the final job row.
    ///
    /// `total` is the size of the record snapshot taken at start; logs
    /// created while the job runs are not part of it.
    pub async fn run(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        change: &KeyChange,
    ) -> Result<PassphraseJob, MigrationError> {
        let mut job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or(MigrationError::JobNotFound(job_id))?;

        let snapshot = self.logs.find_by_user(user_id).await?;
        job.start(snapshot.len() as u64);
        self.jobs.save(&job).await?;
        info!(total = job.total, old_keys = change.old_keys.len(), "re-encryption started");

        for doc in snapshot {
            let log_id = doc.id;
            match self.migrate_record(doc, change).await {
                Ok(Outcome::Reencrypted) => job.record_processed(),
                Ok(Outcome::Skipped) => job.record_skipped(),
                Err(e) => {
                    warn!(log_id = %log_id, error = %e, "failed to re-encrypt log");
                    job.record_error(&e.to_string());
                }
            }
            self.jobs.save(&job).await?;
        }

        job.complete();
        self.jobs.save(&job).await?;
        Ok(job)
    }

    async fn migrate_record(
        &self,
        mut doc: LogDocument,
        change: &KeyChange,
    ) -> Result<Outcome, RecordError> {
        let payload = match doc.cipher.as_ref() {
            None => serde_json::to_value(legacy_plain(&doc)).map_err(CryptoError::Serialize)?,
            Some(cipher) => {
                // Decrypt as raw JSON so client-side fields survive the rewrite
                let opened = change
                    .old_keys
                    .iter()
                    .find_map(|key| decrypt_json::<serde_json::Value>(cipher, key).ok());

                match opened {
                    Some(payload) => payload,
                    None => {
                        if decrypt_json::<serde_json::Value>(cipher, &change.new_key).is_err() {
                            debug!(log_id = %doc.id, "log opens with no known key, leaving as is");
                        }
                        return Ok(Outcome::Skipped);
                    }
                }
            }
        };

        seal(&mut doc, &payload, &change.new_key)?;
        self.logs.save(&doc).await?;
        Ok(Outcome::Reencrypted)
    }

    /// Run the job on the tokio runtime. The lease is held until the task
    /// ends, and job-fatal errors are written to the job row.
    pub fn spawn(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        change: KeyChange,
        lease: MigrationLease,
    ) -> JoinHandle<()> {
        let engine = self.clone();
        let span = info_span!("passphrase_migration", job_id = %job_id, user_id = %user_id);

        tokio::spawn(
            async move {
                let _lease = lease;
                match engine.run(job_id, user_id, &change).await {
                    Ok(job) => info!(
                        processed = job.processed,
                        skipped = job.skipped,
                        errors = job.errors,
                        "re-encryption completed"
                    ),
                    Err(e) => {
                        error!(error = %e, "re-encryption job failed");
                        engine.mark_failed(job_id, &e.to_string()).await;
                    }
                }
            }
            .instrument(span),
        )
    }

    /// Best effort: a job that cannot be loaded or saved is only logged.
    pub async fn mark_failed(&self, job_id: Uuid, message: &str) {
        match self.jobs.find_by_id(job_id).await {
            Ok(Some(mut job)) => {
                job.fail(message);
                if let Err(e) = self.jobs.save(&job).await {
                    error!(job_id = %job_id, error = %e, "could not record job failure");
                }
            }
            Ok(None) => {}
            Err(e) => error!(job_id = %job_id, error = %e, "could not load failed job"),
        }
    }
}
