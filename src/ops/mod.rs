//! High-level operations behind the command-line interface.
//!
//! [`Shelf`] wires the store, the vault and both preference stores together
//! from a [`Config`]. The store and the vault never call each other; anything
//! that needs both (listing hidden records, exporting the vault, importing
//! hidden records) is composed here or in [`crate::transfer`].

use crate::config::Config;
use crate::constants::ENV_VAR_PASSCODE;
use crate::db::DbHandle;
use crate::errors::{AppError, AppResult, CryptoError};
use crate::media::{MediaFormat, MediaRecord};
use crate::prefs::PreferenceStore;
use crate::store::MediaStore;
use crate::vault::VaultController;
use chrono::{DateTime, Utc};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a command needs, opened from configuration.
pub struct Shelf {
    pub config: Config,
    pub prefs: Arc<PreferenceStore>,
    pub session: Arc<PreferenceStore>,
    pub store: MediaStore,
    pub vault: VaultController,
}

impl Shelf {
    /// Opens the shelf described by `config`.
    ///
    /// Creates the data directory if needed, loads both preference stores,
    /// opens the store, and restores a remembered vault unlock.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or any of the
    /// stores fails to load.
    pub fn open(config: Config, now: DateTime<Utc>) -> AppResult<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let prefs = Arc::new(PreferenceStore::open(&config.preferences_path())?);
        let session = Arc::new(PreferenceStore::open(&config.session_path())?);
        let store = MediaStore::open(DbHandle::new(config.database_path()), prefs.clone())?;

        let mut vault = VaultController::load(prefs.clone(), session.clone(), config.kdf_iterations)?;
        vault.hydrate_from_session(now);

        debug!("Shelf opened: {:?}", config);
        Ok(Self {
            config,
            prefs,
            session,
            store,
            vault,
        })
    }

    /// Makes sure the vault is unlocked, asking for the passcode if it is not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if no passcode is configured or the
    /// passcode is wrong, or an I/O error if it cannot be read.
    pub fn require_unlocked(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.vault.is_unlocked_at(now) {
            return Ok(());
        }
        if !self.vault.is_configured() {
            return Err(AppError::Validation(
                "no vault passcode is configured; run `mediashelf vault setup` first".to_string(),
            ));
        }

        let code = read_passcode("Vault passcode: ")?;
        if self
            .vault
            .verify_and_unlock(&code, self.config.unlock_ttl_minutes, now)
        {
            info!("Vault unlocked for this command");
            Ok(())
        } else {
            Err(AppError::Validation("incorrect passcode".to_string()))
        }
    }
}

/// Reads a passcode from `MEDIASHELF_PASSCODE`, or prompts without echo.
///
/// # Errors
///
/// Returns `CryptoError::EmptyPasscode` for an empty entry, or an I/O error
/// if the terminal cannot be read.
pub fn read_passcode(prompt: &str) -> AppResult<String> {
    let code = match std::env::var(ENV_VAR_PASSCODE) {
        Ok(code) => {
            debug!("Using passcode from {}", ENV_VAR_PASSCODE);
            code
        }
        Err(_) => rpassword::prompt_password(prompt)?,
    };

    if code.is_empty() {
        return Err(CryptoError::EmptyPasscode.into());
    }
    Ok(code)
}

/// Applies the tag and format filters of `list`.
pub fn filter_records(
    records: Vec<MediaRecord>,
    tag: Option<&str>,
    format: Option<MediaFormat>,
) -> Vec<MediaRecord> {
    records
        .into_iter()
        .filter(|r| tag.map_or(true, |t| r.tags.iter().any(|rt| rt == t)))
        .filter(|r| format.map_or(true, |f| r.format == f))
        .collect()
}

/// One line per record: id, format, name, url, tags.
pub fn format_table(records: &[MediaRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}\t{}\t{}\t{}\t[{}]",
                r.id,
                r.format,
                r.name,
                r.url,
                r.tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;

    fn record(id: &str, format: MediaFormat, tags: &[&str]) -> MediaRecord {
        MediaRecord {
            id: id.to_string(),
            url: format!("https://example.com/{}", id),
            media_type: MediaType::Other,
            format,
            name: "example.com".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            thumbnail: None,
            created_at: 1,
            is_hidden: false,
        }
    }

    #[test]
    fn test_filter_records() {
        let records = vec![
            record("1", MediaFormat::Image, &["a"]),
            record("2", MediaFormat::Video, &["a", "b"]),
            record("3", MediaFormat::Image, &["b"]),
        ];

        let by_tag = filter_records(records.clone(), Some("a"), None);
        assert_eq!(by_tag.len(), 2);

        let both = filter_records(records.clone(), Some("b"), Some(MediaFormat::Image));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, "3");

        assert_eq!(filter_records(records, None, None).len(), 3);
    }

    #[test]
    fn test_format_table() {
        let table = format_table(&[record("1", MediaFormat::Website, &["x", "y"])]);
        assert_eq!(table, "1\twebsite\texample.com\thttps://example.com/1\t[x, y]");
    }
}
