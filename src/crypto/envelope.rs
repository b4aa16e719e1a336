//! AES-256-GCM envelope for JSON payloads.
//!
//! Wire shape (compatible with WebCrypto output, tag appended to ciphertext):
//!
//! ```json
//! { "v": 1, "alg": "AES-GCM", "iv": "<base64 12 bytes>", "ct": "<base64 ciphertext||tag>" }
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{decode_b64, encode_b64, CryptoError, SymmetricKey};

pub const ENVELOPE_VERSION: u32 = 1;
pub const ALGORITHM: &str = "AES-GCM";

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Self-describing ciphertext stored in a log record's `cipher` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherEnvelope {
    pub v: u32,
    pub alg: String,
    pub iv: String,
    pub ct: String,
}

impl CipherEnvelope {
    /// Stand-in for a stored cipher that does not parse as an envelope.
    /// Never decrypts under any key.
    pub fn unreadable() -> Self {
        Self {
            v: 0,
            alg: String::new(),
            iv: String::new(),
            ct: String::new(),
        }
    }
}

fn cipher_for(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Serialize `value` to JSON and seal it under `key` with a fresh nonce.
pub fn encrypt_json<T>(value: &T, key: &SymmetricKey) -> Result<CipherEnvelope, CryptoError>
where
    T: Serialize + ?Sized,
{
    let plaintext = Zeroizing::new(serde_json::to_vec(value).map_err(CryptoError::Serialize)?);

    let mut iv = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut iv);

    let ct = cipher_for(key)
        .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(CipherEnvelope {
        v: ENVELOPE_VERSION,
        alg: ALGORITHM.to_string(),
        iv: encode_b64(&iv),
        ct: encode_b64(&ct),
    })
}

/// Open `envelope` with `key` and parse the plaintext as `T`.
///
/// Fails on unknown algorithm or version, malformed base64 or lengths, a tag
/// that does not verify (tampering or wrong key), or non-JSON plaintext.
pub fn decrypt_json<T>(envelope: &CipherEnvelope, key: &SymmetricKey) -> Result<T, CryptoError>
where
    T: DeserializeOwned,
{
    if envelope.alg != ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(envelope.alg.clone()));
    }
    if envelope.v == 0 || envelope.v > ENVELOPE_VERSION {
        return Err(CryptoError::UnsupportedVersion(envelope.v));
    }

    let iv = decode_b64("iv", &envelope.iv)?;
    if iv.len() != NONCE_LENGTH {
        return Err(CryptoError::MalformedEnvelope(format!(
            "iv must be {} bytes, got {}",
            NONCE_LENGTH,
            iv.len()
        )));
    }

    let ct = decode_b64("ct", &envelope.ct)?;
    if ct.len() < TAG_LENGTH {
        return Err(CryptoError::MalformedEnvelope(format!(
            "ct shorter than the {}-byte tag",
            TAG_LENGTH
        )));
    }

    let plaintext = Zeroizing::new(
        cipher_for(key)
            .decrypt(Nonce::from_slice(&iv), ct.as_slice())
            .map_err(|_| CryptoError::AuthenticationFailed)?,
    );

    serde_json::from_slice(&plaintext).map_err(CryptoError::InvalidPayload)
}
