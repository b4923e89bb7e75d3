//! Passcode hashing and verification.
//!
//! A passcode is never stored. Instead a [`VaultConfig`] verifier is kept:
//! a random salt plus a PBKDF2-HMAC-SHA256 derived key, both base64 encoded.
//! Derivation is slow (PBKDF2-SHA256); verification compares in constant time.

use crate::constants::{
    DEFAULT_KDF_ITERATIONS, PASSCODE_ALGORITHM, PASSCODE_HASH_LEN, PASSCODE_SALT_LEN,
};
use crate::errors::{AppResult, CryptoError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

/// Persisted passcode verifier.
///
/// Serialized as `{ "salt", "derivedHash", "iterations", "algorithm" }`, the
/// same layout used inside export documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Base64 encoded random salt.
    pub salt: String,
    /// Base64 encoded derived key.
    pub derived_hash: String,
    /// PBKDF2 iteration count used to derive `derived_hash`.
    pub iterations: u32,
    /// Algorithm tag, currently always `PBKDF2-SHA256`.
    pub algorithm: String,
}

/// Hashes a passcode with the default iteration count.
///
/// # Errors
///
/// Returns `CryptoError::EmptyPasscode` for an empty passcode.
///
/// # Example
///
/// ```no_run
/// use mediashelf::crypto::{hash_passcode, verify_passcode};
///
/// let config = hash_passcode("24680")?;
/// assert!(verify_passcode("24680", &config)?);
/// # Ok::<(), mediashelf::AppError>(())
/// ```
pub fn hash_passcode(passcode: &str) -> AppResult<VaultConfig> {
    hash_passcode_with_iterations(passcode, DEFAULT_KDF_ITERATIONS)
}

/// Hashes a passcode with an explicit PBKDF2 iteration count.
///
/// # Errors
///
/// Returns an error if the passcode is empty or `iterations` is zero.
pub fn hash_passcode_with_iterations(passcode: &str, iterations: u32) -> AppResult<VaultConfig> {
    if passcode.is_empty() {
        return Err(CryptoError::EmptyPasscode.into());
    }

    let mut salt = [0u8; PASSCODE_SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let derived = derive(passcode, &salt, iterations)?;
    debug!("Derived passcode verifier with {} iterations", iterations);

    Ok(VaultConfig {
        salt: STANDARD.encode(salt),
        derived_hash: STANDARD.encode(derived.as_slice()),
        iterations,
        algorithm: PASSCODE_ALGORITHM.to_string(),
    })
}

/// Checks a passcode against a stored verifier.
///
/// A wrong passcode yields `Ok(false)`.
///
/// # Errors
///
/// Returns an error only when the verifier itself is unusable: an unknown
/// algorithm tag, undecodable base64, or a zero iteration count.
pub fn verify_passcode(passcode: &str, config: &VaultConfig) -> AppResult<bool> {
    if config.algorithm != PASSCODE_ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(config.algorithm.clone()).into());
    }

    let salt = STANDARD
        .decode(&config.salt)
        .map_err(|e| CryptoError::CorruptConfig(format!("salt is not base64: {}", e)))?;
    let expected = Zeroizing::new(
        STANDARD
            .decode(&config.derived_hash)
            .map_err(|e| CryptoError::CorruptConfig(format!("hash is not base64: {}", e)))?,
    );

    if passcode.is_empty() {
        return Ok(false);
    }

    let derived = derive(passcode, &salt, config.iterations)?;
    Ok(derived.as_slice().ct_eq(expected.as_slice()).into())
}

fn derive(
    passcode: &str,
    salt: &[u8],
    iterations: u32,
) -> AppResult<Zeroizing<[u8; PASSCODE_HASH_LEN]>> {
    if iterations == 0 {
        return Err(
            CryptoError::KeyDerivation("iteration count must be non-zero".to_string()).into(),
        );
    }

    let mut key = Zeroizing::new([0u8; PASSCODE_HASH_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passcode.as_bytes(), salt, iterations, &mut *key);
    Ok(key)
}
