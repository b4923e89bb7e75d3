//! Configuration management for mediashelf.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with sensible defaults.
//!
//! # Environment Variables
//!
//! - `MEDIASHELF_DIR`: Data directory holding the database and preferences
//!   (defaults to ~/.local/share/mediashelf)
//! - `MEDIASHELF_SESSION_DIR`: Session-scoped directory for the unlock expiry
//!   (defaults to $XDG_RUNTIME_DIR/mediashelf, or a directory under the system temp dir)
//! - `MEDIASHELF_UNLOCK_TTL`: Minutes a remembered unlock stays valid (defaults to 20)
//! - `MEDIASHELF_KDF_ITERATIONS`: PBKDF2 iterations for new passcodes (defaults to 150000)
//! - `MEDIASHELF_LOG_FORMAT`: `text` or `json` (defaults to text)

use crate::constants::{
    APP_NAME, DATABASE_FILE_NAME, DEFAULT_DATA_SUBDIR, DEFAULT_KDF_ITERATIONS, DEFAULT_UNLOCK_TTL_MINUTES,
    ENV_VAR_DATA_DIR, ENV_VAR_HOME, ENV_VAR_KDF_ITERATIONS, ENV_VAR_LOG_FORMAT,
    ENV_VAR_SESSION_DIR, ENV_VAR_UNLOCK_TTL, ENV_VAR_XDG_RUNTIME_DIR, LOG_FORMAT_JSON,
    LOG_FORMAT_TEXT, MAX_UNLOCK_TTL_MINUTES, MIN_KDF_ITERATIONS, PREFERENCES_FILE_NAME,
    REDACTED_PLACEHOLDER, SESSION_FILE_NAME,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Configuration for mediashelf.
///
/// # Examples
///
/// Creating a configuration manually:
/// ```
/// use mediashelf::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     data_dir: PathBuf::from("/var/lib/mediashelf"),
///     session_dir: PathBuf::from("/run/user/1000/mediashelf"),
///     unlock_ttl_minutes: 20,
///     kdf_iterations: 150_000,
///     log_format: "text".to_string(),
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct Config {
    /// Directory holding the database file and the durable preference store.
    pub data_dir: PathBuf,

    /// Directory holding session-scoped values; expected to be cleared when the
    /// login session ends.
    pub session_dir: PathBuf,

    /// Minutes a remembered unlock stays valid.
    pub unlock_ttl_minutes: u32,

    /// PBKDF2 iteration count used when a new passcode is hashed.
    pub kdf_iterations: u32,

    /// Log output format, `text` or `json`.
    pub log_format: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &REDACTED_PLACEHOLDER)
            .field("session_dir", &REDACTED_PLACEHOLDER)
            .field("unlock_ttl_minutes", &self.unlock_ttl_minutes)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(""),
            session_dir: PathBuf::from(""),
            unlock_ttl_minutes: DEFAULT_UNLOCK_TTL_MINUTES,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            log_format: LOG_FORMAT_TEXT.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Paths are expanded with `shellexpand` so `~` and `$VAR` references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - Path expansion fails
    /// - A numeric variable is not a number
    /// - The resulting configuration fails [`Config::validate`]
    pub fn load() -> AppResult<Self> {
        let home = env::var(ENV_VAR_HOME).unwrap_or_default();

        let data_dir_raw = env::var(ENV_VAR_DATA_DIR)
            .unwrap_or_else(|_| format!("{}/{}", home, DEFAULT_DATA_SUBDIR));
        let data_dir = expand_path(&data_dir_raw)?;

        let session_dir = match env::var(ENV_VAR_SESSION_DIR) {
            Ok(raw) => expand_path(&raw)?,
            Err(_) => default_session_dir(),
        };

        let unlock_ttl_minutes =
            parse_number_var(ENV_VAR_UNLOCK_TTL)?.unwrap_or(DEFAULT_UNLOCK_TTL_MINUTES);
        let kdf_iterations =
            parse_number_var(ENV_VAR_KDF_ITERATIONS)?.unwrap_or(DEFAULT_KDF_ITERATIONS);

        let log_format = env::var(ENV_VAR_LOG_FORMAT)
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_else(|_| LOG_FORMAT_TEXT.to_string());

        let config = Config {
            data_dir,
            session_dir,
            unlock_ttl_minutes,
            kdf_iterations,
            log_format,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when:
    /// - Either directory is empty or relative
    /// - The unlock TTL is outside 1..=1440 minutes
    /// - The KDF iteration count is below the accepted minimum
    /// - The log format is neither `text` nor `json`
    pub fn validate(&self) -> AppResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }
        if !self.data_dir.is_absolute() {
            return Err(AppError::Config(
                "Data directory must be an absolute path".to_string(),
            ));
        }
        if self.session_dir.as_os_str().is_empty() {
            return Err(AppError::Config(
                "Session directory path is empty".to_string(),
            ));
        }
        if !self.session_dir.is_absolute() {
            return Err(AppError::Config(
                "Session directory must be an absolute path".to_string(),
            ));
        }

        if self.unlock_ttl_minutes == 0 || self.unlock_ttl_minutes > MAX_UNLOCK_TTL_MINUTES {
            return Err(AppError::Config(format!(
                "Unlock TTL must be between 1 and {} minutes, got {}",
                MAX_UNLOCK_TTL_MINUTES, self.unlock_ttl_minutes
            )));
        }

        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(AppError::Config(format!(
                "KDF iterations must be at least {}, got {}",
                MIN_KDF_ITERATIONS, self.kdf_iterations
            )));
        }

        if self.log_format != LOG_FORMAT_TEXT && self.log_format != LOG_FORMAT_JSON {
            return Err(AppError::Config(format!(
                "Unknown log format '{}'. Use '{}' or '{}'",
                self.log_format, LOG_FORMAT_TEXT, LOG_FORMAT_JSON
            )));
        }

        Ok(())
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE_NAME)
    }

    /// Path of the durable preference file.
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE_NAME)
    }

    /// Path of the session-scoped value file.
    pub fn session_path(&self) -> PathBuf {
        self.session_dir.join(SESSION_FILE_NAME)
    }
}

fn expand_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn default_session_dir() -> PathBuf {
    match env::var(ENV_VAR_XDG_RUNTIME_DIR) {
        Ok(runtime) if !runtime.is_empty() => PathBuf::from(runtime).join(APP_NAME),
        _ => env::temp_dir().join(format!("{}-session", APP_NAME)),
    }
}

fn parse_number_var(name: &str) -> AppResult<Option<u32>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} must be a positive integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
