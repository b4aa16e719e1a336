use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::PassphraseJob;
use crate::database::{DatabaseError, JobStore};

/// Creation and lookup of passcode-change jobs
#[derive(Clone)]
pub struct JobLedger {
    jobs: Arc<dyn JobStore>,
}

impl JobLedger {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Persist a new `pending` job for `user_id`
    pub async fn open(
        &self,
        user_id: Uuid,
        enc_version_target: i32,
    ) -> Result<PassphraseJob, DatabaseError> {
        let job = self
            .jobs
            .create(PassphraseJob::pending(user_id, enc_version_target))
            .await?;
        tracing::debug!(job_id = %job.id, user_id = %user_id, "opened passphrase job");
        Ok(job)
    }

    /// The user's most recently created job, whatever its state
    pub async fn latest(&self, user_id: Uuid) -> Result<Option<PassphraseJob>, DatabaseError> {
        self.jobs.latest_for_user(user_id).await
    }
}
