//! Cryptographic primitives for the passcode vault.
//!
//! The vault does not encrypt records; it only gates visibility. This module
//! therefore provides passcode hashing and verification and nothing else.
//!
//! # Example
//!
//! ```no_run
//! use mediashelf::crypto::{hash_passcode, verify_passcode};
//!
//! let config = hash_passcode("97531")?;
//! assert!(verify_passcode("97531", &config)?);
//! assert!(!verify_passcode("97530", &config)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod passcode;

pub use self::passcode::{
    hash_passcode, hash_passcode_with_iterations, verify_passcode, VaultConfig,
};
