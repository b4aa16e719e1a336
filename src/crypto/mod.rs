//! Passcode-derived keys and the authenticated log envelope.
//!
//! `kdf` turns a 4-digit passcode plus a per-user salt into a 256-bit key,
//! `envelope` seals JSON payloads with AES-256-GCM into the
//! `{ v, alg, iv, ct }` envelope stored on encrypted log records.

pub mod envelope;
pub mod kdf;

pub use envelope::{decrypt_json, encrypt_json, CipherEnvelope, ALGORITHM, ENVELOPE_VERSION};
pub use kdf::{
    derive_key, generate_salt, validate_passcode, validate_salt, Passcode, SymmetricKey,
};

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine,
};
use thiserror::Error;

/// Errors raised while deriving keys or sealing/opening envelopes.
///
/// A decryption failure is an expected outcome (wrong key, tampered record)
/// and callers are required to handle it rather than propagate it blindly.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid passcode format")]
    InvalidPasscode,

    #[error("Invalid base64 in {0}")]
    InvalidEncoding(&'static str),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Unsupported cipher: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unsupported envelope version: {0}")]
    UnsupportedVersion(u32),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Decryption failed: authentication tag did not verify")]
    AuthenticationFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Decrypted payload is not valid JSON: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

// Browser clients emit base64 with and without padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn encode_b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, CryptoError> {
    LENIENT_BASE64
        .decode(value.trim())
        .map_err(|_| CryptoError::InvalidEncoding(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_and_unpadded_base64() {
        assert_eq!(decode_b64("salt", "AAAA").unwrap(), vec![0, 0, 0]);
        assert_eq!(decode_b64("salt", "AQ==").unwrap(), vec![1]);
        assert_eq!(decode_b64("salt", "AQ").unwrap(), vec![1]);
    }

    #[test]
    fn rejects_garbage_base64() {
        let err = decode_b64("iv", "not base64!").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidEncoding("iv")));
    }
}
