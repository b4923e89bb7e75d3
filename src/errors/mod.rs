//! Error handling utilities for the mediashelf library.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the store, the vault, and the
//! import/export flow, as well as the convenience type alias `AppResult`.
//!
//! A wrong passcode is not an error: verification reports a mismatch as
//! `false`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Represents specific error cases that can occur during passcode operations.
///
/// # Examples
///
/// ```
/// use mediashelf::errors::CryptoError;
///
/// let error = CryptoError::UnsupportedAlgorithm("scrypt".to_string());
/// assert!(format!("{}", error).contains("scrypt"));
/// ```
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key derivation primitive rejected its parameters.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The stored verifier names an algorithm this build cannot check.
    #[error("Unsupported passcode algorithm '{0}'. The vault configuration may come from a newer version.")]
    UnsupportedAlgorithm(String),

    /// The stored verifier is structurally invalid (bad base64, zero iterations).
    #[error("Corrupt vault configuration: {0}")]
    CorruptConfig(String),

    /// A passcode was required but the supplied one was empty.
    #[error("Passcode cannot be empty")]
    EmptyPasscode,

    /// Setup was requested on a vault that already has a passcode.
    #[error("A passcode is already configured. Use explicit reconfiguration to replace it.")]
    AlreadyConfigured,
}

/// Represents specific error cases that can occur during database operations.
///
/// # Examples
///
/// ```
/// use mediashelf::errors::DatabaseError;
///
/// let error = DatabaseError::StillOpen("destroying the database".to_string());
/// assert!(format!("{}", error).contains("still open"));
/// ```
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite database error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("Failed to get connection from pool: {0}\n\nThis may indicate database connection issues. Try closing other mediashelf instances.")]
    Pool(#[from] r2d2::Error),

    /// Storage cannot be used in this environment at all.
    #[error("Storage unavailable at {path}: {reason}")]
    Unavailable {
        /// Location the database was expected at
        path: PathBuf,
        /// Why it cannot be used
        reason: String,
    },

    /// The operation needs the connection handle to be closed first.
    #[error("Database handle is still open; close it before {0}")]
    StillOpen(String),

    /// A stored row could not be decoded into a record.
    #[error("Corrupt record '{id}': {reason}")]
    CorruptRecord {
        /// Record identifier
        id: String,
        /// Decoding failure
        reason: String,
    },
}

/// Represents errors that occur while reading an import document.
///
/// # Examples
///
/// ```
/// use mediashelf::errors::ImportError;
///
/// let error = ImportError::UnrecognizedShape("number".to_string());
/// assert!(format!("{}", error).contains("number"));
/// ```
#[derive(Debug, Error)]
pub enum ImportError {
    /// The document is not valid JSON.
    #[error("Import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is valid but matches neither the legacy nor the versioned layout.
    #[error("Unrecognized import document: expected an array of items or an object with an `items` array, found {0}")]
    UnrecognizedShape(String),

    /// The supplied passcode matched neither the local nor the imported vault.
    #[error("Passcode does not match the vault that protects the hidden items")]
    PasscodeRejected,
}

/// Represents errors from the lightweight preference stores.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Reading or writing the backing file failed.
    #[error("Failed to access preferences at {path}: {source}")]
    Io {
        /// Preference file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The preference file or a stored value is not valid JSON.
    #[error("Invalid preference value for '{key}': {source}")]
    Format {
        /// Preference key (or file name for whole-file failures)
        key: String,
        /// The underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

/// Represents all possible errors that can occur in the mediashelf library.
///
/// Note: This type does not implement `Clone` to avoid losing error context when
/// cloning `std::io::Error` values.
///
/// # Examples
///
/// Creating a configuration error:
/// ```
/// use mediashelf::errors::AppError;
///
/// let error = AppError::Config("Missing data directory".to_string());
/// assert_eq!(format!("{}", error), "Configuration error: Missing data directory");
/// ```
///
/// Converting from an IO error:
/// ```
/// use mediashelf::errors::AppError;
/// use std::io::{self, ErrorKind};
///
/// let io_error = io::Error::new(ErrorKind::NotFound, "file not found");
/// let app_error: AppError = io_error.into();
///
/// match app_error {
///     AppError::Io(inner) => assert_eq!(inner.kind(), ErrorKind::NotFound),
///     _ => panic!("Expected Io variant"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied data failed validation before any state changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Errors related to passcode hashing and verification.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// Errors related to database operations.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Errors related to reading import documents.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Errors related to the preference stores.
    #[error("Preference error: {0}")]
    Preferences(#[from] PreferenceError),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(DatabaseError::Sqlite(e))
    }
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use mediashelf::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::Validation("url is required".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;
