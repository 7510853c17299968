//! Content digests and Ed25519 signature checks for data files.
//!
//! Everything here is pure: no network, no storage. Callers treat every
//! failure as fatal for the file in question; nothing in this module is
//! retryable.
//!
//! # Signature scheme
//!
//! Files are not signed directly. The signer computes the lowercase hex
//! SHA-256 digest of the file and signs the ASCII bytes of that hex string:
//!
//! ```text
//! file bytes ──sha256──► "9f86d0…" ──ed25519 sign──► signature (128 hex chars)
//! ```

use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Integrity failures for a single file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Digest of the data does not match the expected checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The Ed25519 signature does not verify for this file.
    #[error("signature verification failed for {path}")]
    SignatureInvalid { path: String },

    /// The configured public key is not a 32-byte hex-encoded Ed25519 key.
    #[error("invalid public key encoding")]
    InvalidPublicKey,

    /// The signature is not a 64-byte hex-encoded Ed25519 signature.
    #[error("invalid signature encoding for {path}")]
    InvalidSignatureEncoding { path: String },
}

/// Returns the lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Returns `true` if the digest of `data` equals `expected_checksum`.
///
/// Hex case is ignored.
#[must_use]
pub fn verify_checksum(data: &[u8], expected_checksum: &str) -> bool {
    digest(data).eq_ignore_ascii_case(expected_checksum)
}

/// Like [`verify_checksum`] but returns the mismatch as an error.
///
/// # Errors
///
/// Returns [`IntegrityError::ChecksumMismatch`] if the digest differs.
pub fn ensure_checksum(data: &[u8], expected_checksum: &str) -> Result<(), IntegrityError> {
    let actual = digest(data);
    if actual.eq_ignore_ascii_case(expected_checksum) {
        Ok(())
    } else {
        Err(IntegrityError::ChecksumMismatch { expected: expected_checksum.to_string(), actual })
    }
}

/// Verifies an Ed25519 signature over the hex digest of `data`.
///
/// `path` only labels the error so a failure can be traced to the file that
/// caused it.
///
/// # Errors
///
/// - [`IntegrityError::InvalidPublicKey`] if the key is not 32 hex-encoded bytes
///   or not a valid curve point
/// - [`IntegrityError::InvalidSignatureEncoding`] if the signature is not 64
///   hex-encoded bytes
/// - [`IntegrityError::SignatureInvalid`] if verification fails
pub fn verify_signature(
    data: &[u8],
    signature_hex: &str,
    public_key_hex: &str,
    path: &str,
) -> Result<(), IntegrityError> {
    let verifying_key = parse_public_key(public_key_hex)?;
    let signature_bytes = decode_hex_64(signature_hex)
        .ok_or_else(|| IntegrityError::InvalidSignatureEncoding { path: path.to_string() })?;
    let signature = Signature::from_bytes(&signature_bytes);

    let message = digest(data);
    verifying_key
        .verify_strict(message.as_bytes(), &signature)
        .map_err(|_| IntegrityError::SignatureInvalid { path: path.to_string() })
}

/// Parses a hex-encoded Ed25519 public key.
///
/// # Errors
///
/// Returns [`IntegrityError::InvalidPublicKey`] on bad encoding or an invalid point.
pub fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey, IntegrityError> {
    let bytes = hex::decode(public_key_hex).map_err(|_| IntegrityError::InvalidPublicKey)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| IntegrityError::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| IntegrityError::InvalidPublicKey)
}

fn decode_hex_64(input: &str) -> Option<[u8; 64]> {
    hex::decode(input).ok()?.try_into().ok()
}
