use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// `last_error` is cut to this many characters before it is persisted.
pub const LAST_ERROR_MAX_CHARS: usize = 300;

/// Lifecycle of a re-encryption job: `pending -> running -> completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state '{}'", other)),
        }
    }
}

/// Ledger entry for one passcode-change migration.
///
/// Counters only grow while the job runs, and
/// `processed + skipped + errors <= total` holds at every save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassphraseJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: JobState,
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub enc_version_target: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PassphraseJob {
    pub fn pending(user_id: Uuid, enc_version_target: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            state: JobState::Pending,
            total: 0,
            processed: 0,
            skipped: 0,
            errors: 0,
            last_error: None,
            started_at: None,
            finished_at: None,
            enc_version_target,
            created_at: now,
            updated_at: now,
        }
    }

    /// Enter `running` with a fresh set of counters.
    pub fn start(&mut self, total: u64) {
        let now = Utc::now();
        self.state = JobState::Running;
        self.started_at = Some(now);
        self.total = total;
        self.processed = 0;
        self.skipped = 0;
        self.errors = 0;
        self.updated_at = now;
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
        self.updated_at = Utc::now();
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
        self.updated_at = Utc::now();
    }

    pub fn record_error(&mut self, message: &str) {
        self.errors += 1;
        self.last_error = Some(truncate_message(message));
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        let now = Utc::now();
        self.state = JobState::Completed;
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    pub fn fail(&mut self, message: &str) {
        let now = Utc::now();
        self.state = JobState::Failed;
        self.last_error = Some(truncate_message(message));
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Records visited so far.
    pub fn accounted(&self) -> u64 {
        self.processed + self.skipped + self.errors
    }
}

fn truncate_message(message: &str) -> String {
    message.chars().take(LAST_ERROR_MAX_CHARS).collect()
}
