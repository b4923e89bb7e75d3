//! Constants used throughout the application.
//!
//! This module contains all constants used in mediashelf, organized into
//! logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "mediashelf";

// Logging
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Configuration Keys & Environment Variables
/// Environment variable for the data directory (database + preferences).
pub const ENV_VAR_DATA_DIR: &str = "MEDIASHELF_DIR";
/// Environment variable for the session-scoped directory.
pub const ENV_VAR_SESSION_DIR: &str = "MEDIASHELF_SESSION_DIR";
/// Environment variable for the unlock TTL in minutes.
pub const ENV_VAR_UNLOCK_TTL: &str = "MEDIASHELF_UNLOCK_TTL";
/// Environment variable for the PBKDF2 iteration count used for new passcodes.
pub const ENV_VAR_KDF_ITERATIONS: &str = "MEDIASHELF_KDF_ITERATIONS";
/// Environment variable supplying the passcode non-interactively (scripts, tests).
pub const ENV_VAR_PASSCODE: &str = "MEDIASHELF_PASSCODE";
/// Environment variable selecting `text` or `json` log output.
pub const ENV_VAR_LOG_FORMAT: &str = "MEDIASHELF_LOG_FORMAT";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Per-login runtime directory, cleared when the session ends.
pub const ENV_VAR_XDG_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
/// Default data sub-directory within the user's home directory.
pub const DEFAULT_DATA_SUBDIR: &str = ".local/share/mediashelf";
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Storage
/// File name of the SQLite database inside the data directory.
pub const DATABASE_FILE_NAME: &str = "mediashelf.db";
/// File name of the durable preference store inside the data directory.
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";
/// File name of the session-scoped store inside the session directory.
pub const SESSION_FILE_NAME: &str = "session.json";
/// Table holding the public partition.
pub const PUBLIC_TABLE: &str = "media_public";
/// Table holding the hidden partition.
pub const HIDDEN_TABLE: &str = "media_hidden";
/// Maximum pooled SQLite connections.
pub const DB_POOL_SIZE: u32 = 4;

// Preference keys
/// JSON array of tags suppressed from the public view.
pub const PREF_HIDDEN_TAGS: &str = "hiddenTags";
/// JSON object holding the passcode verifier and vault preferences.
pub const PREF_VAULT: &str = "vault";
/// Theme preference.
pub const PREF_THEME: &str = "theme";
/// Gallery layout preference.
pub const PREF_LAYOUT: &str = "layout";
/// Session key holding the unlock expiry (epoch milliseconds).
pub const SESSION_UNLOCK_UNTIL: &str = "unlockUntil";

// Vault
/// Unlock duration used when the caller does not pick one.
pub const DEFAULT_UNLOCK_TTL_MINUTES: u32 = 20;
/// Longest permitted unlock duration (one day).
pub const MAX_UNLOCK_TTL_MINUTES: u32 = 24 * 60;
/// PBKDF2 iterations for newly created passcodes.
pub const DEFAULT_KDF_ITERATIONS: u32 = 150_000;
/// Lowest iteration count accepted from configuration.
pub const MIN_KDF_ITERATIONS: u32 = 1_000;
/// Random salt length in bytes.
pub const PASSCODE_SALT_LEN: usize = 16;
/// Derived key length in bytes (256 bits).
pub const PASSCODE_HASH_LEN: usize = 32;
/// Algorithm tag written into every verifier.
pub const PASSCODE_ALGORITHM: &str = "PBKDF2-SHA256";

// Import/export
/// Version number written into export documents.
pub const EXPORT_VERSION: u32 = 2;
