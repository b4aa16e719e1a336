use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::crypto::CipherEnvelope;

use super::models::{Anchor, JobState, LogDocument, PassphraseJob, User};
use super::{AnchorStore, DatabaseError, JobStore, LogStore, UserStore};

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct LogRow {
    id: Uuid,
    user_id: Uuid,
    time: DateTime<Utc>,
    cipher: Option<Json<serde_json::Value>>,
    mood_score: Option<i32>,
    trigger: String,
    emotion: String,
    intensity: Option<i32>,
    anchor: String,
    contributing: Vec<String>,
}

impl From<LogRow> for LogDocument {
    fn from(row: LogRow) -> Self {
        LogDocument {
            id: row.id,
            user_id: row.user_id,
            time: row.time,
            cipher: row.cipher.map(|Json(raw)| parse_cipher(row.id, raw)),
            mood_score: row.mood_score,
            trigger: row.trigger,
            emotion: row.emotion,
            intensity: row.intensity,
            anchor: row.anchor,
            contributing: row.contributing,
        }
    }
}

/// Parse one row's `cipher` column. A malformed value stays encrypted but
/// unreadable so it degrades that record alone.
fn parse_cipher(log_id: Uuid, raw: serde_json::Value) -> CipherEnvelope {
    serde_json::from_value(raw).unwrap_or_else(|e| {
        warn!(log_id = %log_id, error = %e, "stored cipher is not a valid envelope");
        CipherEnvelope::unreadable()
    })
}

#[derive(FromRow)]
struct JobRow {
    id: Uuid,
    user_id: Uuid,
    state: String,
    total: i64,
    processed: i64,
    skipped: i64,
    errors: i64,
    last_error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    enc_version_target: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for PassphraseJob {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state: JobState = row
            .state
            .parse()
            .map_err(|e| DatabaseError::Corrupt(format!("passphrase job {}: {}", row.id, e)))?;
        Ok(PassphraseJob {
            id: row.id,
            user_id: row.user_id,
            state,
            total: row.total.max(0) as u64,
            processed: row.processed.max(0) as u64,
            skipped: row.skipped.max(0) as u64,
            errors: row.errors.max(0) as u64,
            last_error: row.last_error,
            started_at: row.started_at,
            finished_at: row.finished_at,
            enc_version_target: row.enc_version_target,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, username, password_hash, avatar_color, enc_salt, enc_key, enc_version, custom_factors, created_at";
const LOG_COLUMNS: &str = "id, user_id, time, cipher, mood_score, trigger, emotion, intensity, anchor, contributing";
const ANCHOR_COLUMNS: &str = "id, user_id, text, group_name, is_favorite, favorite_rank, is_user_created";
const JOB_COLUMNS: &str = "id, user_id, state, total, processed, skipped, errors, last_error, started_at, finished_at, enc_version_target, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: User) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.avatar_color)
            .bind(&user.enc_salt)
            .bind(&user.enc_key)
            .bind(user.enc_version)
            .bind(&user.custom_factors)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DatabaseError::Conflict(format!("user with email {} already exists", user.email))
                } else {
                    e.into()
                }
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn ensure_salt(&self, id: Uuid, candidate: &str) -> Result<String, DatabaseError> {
        // COALESCE keeps an existing salt even if two requests race here
        let salt: Option<(Option<String>,)> = sqlx::query_as(
            "UPDATE users SET enc_salt = COALESCE(enc_salt, $2) WHERE id = $1 RETURNING enc_salt",
        )
        .bind(id)
        .bind(candidate)
        .fetch_optional(&self.pool)
        .await?;

        match salt {
            Some((Some(salt),)) => Ok(salt),
            Some((None,)) => Err(DatabaseError::Corrupt(format!("user {} has no salt after update", id))),
            None => Err(DatabaseError::NotFound(format!("user {}", id))),
        }
    }

    async fn set_key(
        &self,
        id: Uuid,
        key_b64: &str,
        enc_version: i32,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET enc_key = $2, enc_version = $3 WHERE id = $1")
            .bind(id)
            .bind(key_b64)
            .bind(enc_version)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn add_custom_factor(
        &self,
        id: Uuid,
        factor: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let appended: Option<(Vec<String>,)> = sqlx::query_as(
            r#"
            UPDATE users SET custom_factors = array_append(custom_factors, $2)
            WHERE id = $1 AND NOT ($2 = ANY(custom_factors))
            RETURNING custom_factors
            "#,
        )
        .bind(id)
        .bind(factor)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((factors,)) = appended {
            return Ok(factors);
        }
        match UserStore::find_by_id(self, id).await? {
            Some(_) => Err(DatabaseError::Conflict(format!("factor {} already exists", factor))),
            None => Err(DatabaseError::NotFound(format!("user {}", id))),
        }
    }

    async fn set_avatar_color(&self, id: Uuid, color: &str) -> Result<User, DatabaseError> {
        let sql = format!("UPDATE users SET avatar_color = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(color)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn insert(&self, doc: LogDocument) -> Result<LogDocument, DatabaseError> {
        let sql = format!(
            "INSERT INTO logs ({LOG_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {LOG_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LogRow>(&sql)
            .bind(doc.id)
            .bind(doc.user_id)
            .bind(doc.time)
            .bind(doc.cipher.as_ref().map(Json))
            .bind(doc.mood_score)
            .bind(&doc.trigger)
            .bind(&doc.emotion)
            .bind(doc.intensity)
            .bind(&doc.anchor)
            .bind(&doc.contributing)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogDocument>, DatabaseError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM logs WHERE id = $1");
        let row = sqlx::query_as::<_, LogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<LogDocument>, DatabaseError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM logs WHERE user_id = $1 ORDER BY time, id");
        let rows = sqlx::query_as::<_, LogRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save(&self, doc: &LogDocument) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE logs
            SET time = $2, cipher = $3, mood_score = $4, trigger = $5, emotion = $6,
                intensity = $7, anchor = $8, contributing = $9
            WHERE id = $1
            "#,
        )
        .bind(doc.id)
        .bind(doc.time)
        .bind(doc.cipher.as_ref().map(Json))
        .bind(doc.mood_score)
        .bind(&doc.trigger)
        .bind(&doc.emotion)
        .bind(doc.intensity)
        .bind(&doc.anchor)
        .bind(&doc.contributing)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("log {}", doc.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create(&self, job: PassphraseJob) -> Result<PassphraseJob, DatabaseError> {
        let sql = format!(
            "INSERT INTO passphrase_jobs ({JOB_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job.id)
            .bind(job.user_id)
            .bind(job.state.as_str())
            .bind(job.total as i64)
            .bind(job.processed as i64)
            .bind(job.skipped as i64)
            .bind(job.errors as i64)
            .bind(&job.last_error)
            .bind(job.started_at)
            .bind(job.finished_at)
            .bind(job.enc_version_target)
            .bind(job.created_at)
            .bind(job.updated_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PassphraseJob>, DatabaseError> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM passphrase_jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(PassphraseJob::try_from)
            .transpose()
    }

    async fn save(&self, job: &PassphraseJob) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE passphrase_jobs
            SET state = $2, total = $3, processed = $4, skipped = $5, errors = $6,
                last_error = $7, started_at = $8, finished_at = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.state.as_str())
        .bind(job.total as i64)
        .bind(job.processed as i64)
        .bind(job.skipped as i64)
        .bind(job.errors as i64)
        .bind(&job.last_error)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("passphrase job {}", job.id)));
        }
        Ok(())
    }

    async fn latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<PassphraseJob>, DatabaseError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM passphrase_jobs WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, JobRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(PassphraseJob::try_from)
            .transpose()
    }
}

#[async_trait]
impl AnchorStore for PgStore {
    async fn insert_anchors(&self, anchors: Vec<Anchor>) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO anchors ({ANCHOR_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        let mut tx = self.pool.begin().await?;
        for anchor in &anchors {
            sqlx::query(&sql)
                .bind(anchor.id)
                .bind(anchor.user_id)
                .bind(&anchor.text)
                .bind(&anchor.group)
                .bind(anchor.is_favorite)
                .bind(anchor.favorite_rank)
                .bind(anchor.is_user_created)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn anchors_for_user(&self, user_id: Uuid) -> Result<Vec<Anchor>, DatabaseError> {
        let sql = format!(
            "SELECT {ANCHOR_COLUMNS} FROM anchors WHERE user_id = $1 ORDER BY group_name, text"
        );
        Ok(sqlx::query_as::<_, Anchor>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_anchor(&self, id: Uuid) -> Result<Option<Anchor>, DatabaseError> {
        let sql = format!("SELECT {ANCHOR_COLUMNS} FROM anchors WHERE id = $1");
        Ok(sqlx::query_as::<_, Anchor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_anchor(&self, anchor: &Anchor) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE anchors
            SET text = $2, group_name = $3, is_favorite = $4, favorite_rank = $5, is_user_created = $6
            WHERE id = $1
            "#,
        )
        .bind(anchor.id)
        .bind(&anchor.text)
        .bind(&anchor.group)
        .bind(anchor.is_favorite)
        .bind(anchor.favorite_rank)
        .bind(anchor.is_user_created)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("anchor {}", anchor.id)));
        }
        Ok(())
    }

    async fn delete_anchor(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM anchors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{decrypt_json, encrypt_json, SymmetricKey};
    use crate::database::models::LogPlaintext;
    use crate::services::log_codec::read_plain;
    use serde_json::json;

    fn log_row(cipher: Option<serde_json::Value>) -> LogRow {
        LogRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            time: Utc::now(),
            cipher: cipher.map(Json),
            mood_score: Some(4),
            trigger: String::new(),
            emotion: String::new(),
            intensity: None,
            anchor: String::new(),
            contributing: Vec::new(),
        }
    }

    #[test]
    fn well_formed_cipher_column_parses() {
        let key = SymmetricKey::generate();
        let envelope = encrypt_json(&json!({ "emotion": "Calm" }), &key).unwrap();

        let doc: LogDocument = log_row(Some(serde_json::to_value(&envelope).unwrap())).into();
        assert_eq!(doc.cipher.as_ref(), Some(&envelope));
        let plain: LogPlaintext = decrypt_json(&envelope, &key).unwrap();
        assert_eq!(plain.emotion, "Calm");
    }

    #[test]
    fn malformed_cipher_column_degrades_one_record() {
        let key = SymmetricKey::generate();
        for raw in [
            json!({ "alg": "AES-GCM", "iv": "AAAA", "ct": "AAAA" }),
            json!({ "v": 1, "alg": "AES-GCM", "iv": 5, "ct": "AAAA" }),
            json!("not an object"),
        ] {
            let doc: LogDocument = log_row(Some(raw)).into();
            assert!(doc.is_encrypted());

            let plain = read_plain(&doc, Some(&key));
            assert!(plain.emotion.is_empty());
            assert_eq!(plain.mood_score, Some(4));
        }

        let legacy: LogDocument = log_row(None).into();
        assert!(!legacy.is_encrypted());
    }

    fn job_row(state: &str) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            state: state.to_string(),
            total: 4,
            processed: 2,
            skipped: 1,
            errors: 0,
            last_error: None,
            started_at: Some(now),
            finished_at: None,
            enc_version_target: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn job_rows_convert_to_jobs() {
        let job: PassphraseJob = job_row("running").try_into().unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.accounted(), 3);
        assert_eq!(job.total, 4);
    }

    #[test]
    fn unknown_job_state_is_reported_as_corrupt() {
        let result: Result<PassphraseJob, _> = job_row("exploded").try_into();
        assert!(matches!(result, Err(DatabaseError::Corrupt(_))));
    }
}
