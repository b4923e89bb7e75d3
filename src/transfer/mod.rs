//! Import and export of the whole shelf.
//!
//! Export writes an [`ExportPayload`]. Import accepts that layout as well as
//! the older bare-array layout, classified once by [`ImportRequest::parse`].
//! [`import_document`] composes the store and the vault: public records are
//! merged (or replace everything), and hidden records are restored only after
//! the supplied passcode checks out.

mod payload;

pub use self::payload::{export_payload, ExportPayload, ImportRequest, VersionedImport};
pub use crate::store::{ImportCandidate, ImportSummary};

use crate::crypto::verify_passcode;
use crate::errors::{AppError, AppResult, CryptoError, ImportError};
use crate::store::MediaStore;
use crate::vault::VaultController;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// How public records from the document are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Add records whose URL is not already present.
    #[default]
    Merge,
    /// Clear both partitions and the hidden-tag list first.
    Overwrite,
}

/// Options for [`import_document`].
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Passcode used to restore hidden records. Without it they are skipped.
    pub passcode: Option<String>,
}

/// Result of [`import_document`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
    pub hidden_restored: usize,
    pub hidden_skipped: usize,
    /// A local passcode was created from the one used for this import.
    pub vault_bootstrapped: bool,
}

/// Applies an import document to the store.
///
/// Hidden records are handled as follows:
///
/// - no passcode supplied: they are skipped and counted in `hidden_skipped`
/// - a local passcode exists: the supplied code must match it
/// - otherwise, if the document carries a `vaultConfig`, the code must match
///   that, and a new local passcode is set up from the same code (with a new
///   salt, so the stored verifier differs from the imported one)
/// - with neither, the supplied code becomes the local passcode
///
/// Restored hidden records keep their ids and `createdAt` where possible.
/// The passcode is checked before anything is written.
///
/// # Errors
///
/// Returns, with nothing changed:
///
/// - `ImportError::PasscodeRejected` when the passcode does not match
/// - `CryptoError::EmptyPasscode` when a blank code would become the local one
///
/// Otherwise returns any store or vault error.
pub fn import_document(
    store: &MediaStore,
    vault: &mut VaultController,
    request: &ImportRequest,
    options: &ImportOptions,
) -> AppResult<ImportReport> {
    let hidden = request.hidden_candidates();
    let restore_with = match (&options.passcode, hidden.is_empty()) {
        (_, true) => None,
        (None, false) => {
            warn!(
                "Skipping {} hidden records: no passcode supplied",
                hidden.len()
            );
            None
        }
        (Some(code), false) => Some(authorize(vault, request, code)?),
    };

    let candidates = request.candidates();
    let mut report = ImportReport::default();
    match options.mode {
        ImportMode::Merge => {
            let summary = store.import_items(&candidates)?;
            report.added = summary.added;
            report.skipped = summary.skipped;
        }
        ImportMode::Overwrite => {
            let written = store.overwrite_with_items(&candidates)?;
            report.added = written;
            report.skipped = candidates.len() - written;
        }
    }

    match restore_with {
        None => report.hidden_skipped = hidden.len(),
        Some(auth) => {
            if let Authorization::Bootstrap(code) = auth {
                vault.setup_passcode(&code)?;
                report.vault_bootstrapped = true;
            }
            let summary = store.import_hidden_items(&hidden)?;
            report.hidden_restored = summary.added;
            report.hidden_skipped = summary.skipped;
        }
    }

    info!(
        "Import finished: {} added, {} skipped, {} hidden restored",
        report.added, report.skipped, report.hidden_restored
    );
    Ok(report)
}

enum Authorization {
    /// The local vault accepted the passcode.
    Local,
    /// The passcode must become the local one.
    Bootstrap(String),
}

fn authorize(
    vault: &VaultController,
    request: &ImportRequest,
    code: &str,
) -> AppResult<Authorization> {
    if let Some(local) = vault.config() {
        return if check(code, local)? {
            Ok(Authorization::Local)
        } else {
            Err(ImportError::PasscodeRejected.into())
        };
    }

    match request.vault_config() {
        Some(imported) if !check(code, imported)? => Err(ImportError::PasscodeRejected.into()),
        _ if code.trim().is_empty() => Err(CryptoError::EmptyPasscode.into()),
        _ => {
            debug!("Passcode will bootstrap the local vault");
            Ok(Authorization::Bootstrap(code.to_string()))
        }
    }
}

fn check(code: &str, config: &crate::crypto::VaultConfig) -> AppResult<bool> {
    match verify_passcode(code, config) {
        Ok(matched) => Ok(matched),
        Err(AppError::Crypto(e)) => {
            warn!("Vault configuration cannot verify passcodes: {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Writes an export atomically: readers see the old file or the new one.
///
/// # Errors
///
/// Returns an I/O error if the directory is not writable.
pub fn write_export(path: &Path, payload: &ExportPayload) -> AppResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let body = serde_json::to_vec_pretty(payload).map_err(std::io::Error::from)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;

    info!(
        "Exported {} records to {:?}",
        payload.items.len() + payload.hidden_items.as_ref().map_or(0, Vec::len),
        path
    );
    Ok(())
}

/// Reads and classifies an import file.
pub fn read_import(path: &Path) -> AppResult<ImportRequest> {
    let raw = fs::read_to_string(path)?;
    Ok(ImportRequest::parse(&raw)?)
}
