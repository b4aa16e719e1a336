//! PBKDF2 key derivation from a 4-digit passcode.
//!
//! The passcode space is only 10^4, so the per-user salt and the iteration
//! count are what stand between a leaked database and every journal entry.

use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::{decode_b64, encode_b64, CryptoError};

/// PBKDF2-HMAC-SHA256 rounds.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// 256-bit key for AES-256-GCM.
pub const KEY_LENGTH: usize = 32;

/// Length of freshly generated server salts.
pub const SALT_LENGTH: usize = 16;

const PASSCODE_DIGITS: usize = 4;

/// A validated passcode: exactly four ASCII digits.
///
/// Wiped from memory on drop; never persisted.
pub struct Passcode(Zeroizing<String>);

impl Passcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Passcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passcode([REDACTED])")
    }
}

/// Symmetric key for one user's logs.
///
/// Key bytes are zeroized on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LENGTH],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parse the base64 form kept in the user record.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let raw = Zeroizing::new(decode_b64("encKey", encoded)?);
        let bytes: [u8; KEY_LENGTH] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(raw.len()))?;
        Ok(Self { bytes })
    }

    pub fn to_base64(&self) -> String {
        encode_b64(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.bytes
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        // constant-time
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SymmetricKey {}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Accept exactly four ASCII digits, ignoring surrounding whitespace.
pub fn validate_passcode(raw: &str) -> Result<Passcode, CryptoError> {
    let trimmed = raw.trim();
    if trimmed.len() == PASSCODE_DIGITS && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        Ok(Passcode(Zeroizing::new(trimmed.to_string())))
    } else {
        Err(CryptoError::InvalidPasscode)
    }
}

/// Derive the log key for `(passcode, salt)`.
///
/// Deterministic and side-effect free. Runs 200k PBKDF2 rounds, so async
/// callers should move it onto the blocking pool.
pub fn derive_key(passcode: &Passcode, salt_b64: &str) -> Result<SymmetricKey, CryptoError> {
    let salt = decode_b64("salt", salt_b64)?;
    let mut bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(
        passcode.as_str().as_bytes(),
        &salt,
        PBKDF2_ITERATIONS,
        &mut bytes,
    );
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Fresh random salt, base64 encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LENGTH];
    OsRng.fill_bytes(&mut salt);
    encode_b64(&salt)
}

/// Check that a client-supplied salt is usable for `derive_key`.
pub fn validate_salt(salt_b64: &str) -> Result<(), CryptoError> {
    if decode_b64("salt", salt_b64)?.is_empty() {
        return Err(CryptoError::InvalidEncoding("salt"));
    }
    Ok(())
}
