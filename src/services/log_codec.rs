//! Translation between stored `LogDocument`s and the plaintext the API and
//! the migration engine work with.
//!
//! Reads never fail: an envelope that cannot be opened yields the default
//! plaintext (and a `warn!`), so one bad record cannot break a listing.

use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::crypto::{decrypt_json, encrypt_json, CryptoError, SymmetricKey};
use crate::database::models::{LogDocument, LogPlaintext, LogView, User, DEFAULT_INTENSITY};

/// The user's current log key, if one has been set.
pub fn current_key(user: &User) -> Option<SymmetricKey> {
    let encoded = user.enc_key.as_deref()?;
    match SymmetricKey::from_base64(encoded) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "stored log key is unusable");
            None
        }
    }
}

/// Plaintext view of a record that was never encrypted.
pub fn legacy_plain(doc: &LogDocument) -> LogPlaintext {
    LogPlaintext {
        trigger: doc.trigger.clone(),
        emotion: doc.emotion.clone(),
        intensity: doc.intensity.unwrap_or(DEFAULT_INTENSITY),
        anchor: doc.anchor.clone(),
        contributing: doc.contributing.clone(),
        time: Some(doc.time),
        mood_score: doc.mood_score,
    }
}

/// Plaintext for any stored record, falling back to defaults when the
/// envelope cannot be opened with `key`.
pub fn read_plain(doc: &LogDocument, key: Option<&SymmetricKey>) -> LogPlaintext {
    let Some(cipher) = doc.cipher.as_ref() else {
        return legacy_plain(doc);
    };

    let opened = match key {
        Some(key) => decrypt_json::<LogPlaintext>(cipher, key),
        None => {
            warn!(log_id = %doc.id, user_id = %doc.user_id, "encrypted log read without a key");
            return fallback(doc);
        }
    };

    match opened {
        Ok(mut plain) => {
            plain.time.get_or_insert(doc.time);
            if plain.mood_score.is_none() {
                plain.mood_score = doc.mood_score;
            }
            plain
        }
        Err(e) => {
            warn!(
                log_id = %doc.id,
                user_id = %doc.user_id,
                reason = %e,
                "could not decrypt log, returning defaults"
            );
            fallback(doc)
        }
    }
}

fn fallback(doc: &LogDocument) -> LogPlaintext {
    LogPlaintext {
        time: Some(doc.time),
        mood_score: doc.mood_score,
        ..LogPlaintext::default()
    }
}

/// Build a new record for `user_id`. Encrypted when a key is given,
/// legacy plaintext otherwise. `mood_score` is always kept in the clear.
pub fn write_plain(
    plain: LogPlaintext,
    user_id: Uuid,
    key: Option<&SymmetricKey>,
) -> Result<LogDocument, CryptoError> {
    let time = plain.time.unwrap_or_else(Utc::now);
    let mut doc = LogDocument {
        id: Uuid::new_v4(),
        user_id,
        time,
        cipher: None,
        mood_score: plain.mood_score,
        trigger: plain.trigger.clone(),
        emotion: plain.emotion.clone(),
        intensity: Some(plain.intensity),
        anchor: plain.anchor.clone(),
        contributing: plain.contributing.clone(),
    };

    if let Some(key) = key {
        let sealed = LogPlaintext {
            time: Some(time),
            ..plain
        };
        seal(&mut doc, &sealed, key)?;
    }

    Ok(doc)
}

/// Replace `doc`'s contents with a fresh envelope of `payload` under `key`.
pub fn seal<T>(doc: &mut LogDocument, payload: &T, key: &SymmetricKey) -> Result<(), CryptoError>
where
    T: Serialize + ?Sized,
{
    doc.cipher = Some(encrypt_json(payload, key)?);
    doc.clear_plaintext();
    Ok(())
}

pub fn to_view(doc: &LogDocument, key: Option<&SymmetricKey>) -> LogView {
    let plain = read_plain(doc, key);
    LogView {
        id: doc.id,
        time: doc.time,
        trigger: plain.trigger,
        emotion: plain.emotion,
        intensity: plain.intensity,
        anchor: plain.anchor,
        contributing: plain.contributing,
        mood_score: doc.mood_score,
        encrypted: doc.is_encrypted(),
    }
}
