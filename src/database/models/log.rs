use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::CipherEnvelope;

/// Intensity assumed when a legacy record or decrypted payload omits it.
pub const DEFAULT_INTENSITY: i32 = 5;

fn default_intensity() -> i32 {
    DEFAULT_INTENSITY
}

/// A log record as persisted.
///
/// Either legacy plaintext (no `cipher`, sensitive fields populated) or
/// encrypted (`cipher` set, sensitive fields empty). `mood_score` is always
/// plaintext so trends can be computed without decrypting.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub time: DateTime<Utc>,
    pub cipher: Option<CipherEnvelope>,
    pub mood_score: Option<i32>,
    pub trigger: String,
    pub emotion: String,
    pub intensity: Option<i32>,
    pub anchor: String,
    pub contributing: Vec<String>,
}

impl LogDocument {
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Drop every sensitive plaintext field, leaving only the envelope,
    /// `time` and `mood_score`.
    pub fn clear_plaintext(&mut self) {
        self.trigger.clear();
        self.emotion.clear();
        self.intensity = None;
        self.anchor.clear();
        self.contributing.clear();
    }
}

/// The sensitive part of a log, and the JSON object that gets encrypted.
///
/// Unknown fields from client-encrypted payloads are ignored; missing ones
/// fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPlaintext {
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default = "default_intensity")]
    pub intensity: i32,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub contributing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_score: Option<i32>,
}

impl Default for LogPlaintext {
    fn default() -> Self {
        Self {
            trigger: String::new(),
            emotion: String::new(),
            intensity: DEFAULT_INTENSITY,
            anchor: String::new(),
            contributing: Vec::new(),
            time: None,
            mood_score: None,
        }
    }
}

/// Client-facing shape of a log; encryption is invisible apart from the
/// `encrypted` flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogView {
    pub id: Uuid,
    pub time: DateTime<Utc>,
    pub trigger: String,
    pub emotion: String,
    pub intensity: i32,
    pub anchor: String,
    pub contributing: Vec<String>,
    pub mood_score: Option<i32>,
    pub encrypted: bool,
}

/// One sample of the plaintext mood series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodPoint {
    pub id: Uuid,
    pub time: DateTime<Utc>,
    pub mood_score: i32,
}
