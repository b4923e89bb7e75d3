//! Small synchronous key-value preference stores.
//!
//! A [`PreferenceStore`] is a string-keyed map persisted as one JSON object.
//! The same type backs two stores with different lifetimes:
//!
//! - the durable store in the data directory (hidden tags, vault verifier,
//!   theme, layout)
//! - the session store in the session directory (unlock expiry), which is
//!   expected to disappear when the login session ends
//!
//! Every write re-reads the file, applies its change and replaces the file
//! atomically (temp file + rename), all while holding an advisory lock on a
//! sidecar `.lock` file. Concurrent processes never observe a half-written
//! file, and writes to different keys do not overwrite each other.

use crate::constants::{PREF_LAYOUT, PREF_THEME};
use crate::errors::{AppResult, PreferenceError};
use fs2::FileExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// String-keyed preference map with optional file backing.
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore {
    /// Opens (or lazily creates) a preference file.
    ///
    /// A missing file is an empty store; the file and its directory are created
    /// on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a JSON
    /// object of strings.
    pub fn open(path: &Path) -> AppResult<Self> {
        let values = read_map(path)?;
        debug!("Opened preference store with {} keys", values.len());
        Ok(Self {
            path: Some(path.to_path_buf()),
            values: Mutex::new(values),
        })
    }

    /// Creates a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the raw string stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Stores a raw string under `key` and persists.
    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.write_with(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    /// Removes `key` and persists. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> AppResult<()> {
        self.write_with(|values| values.remove(key).is_some())
    }

    /// Decodes the JSON value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `PreferenceError::Format` if the stored string is not valid
    /// JSON for `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key) {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| {
                    PreferenceError::Format {
                        key: key.to_string(),
                        source,
                    }
                    .into()
                }),
            None => Ok(None),
        }
    }

    /// Stores `value` as JSON under `key`.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| PreferenceError::Format {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &raw)
    }

    /// Theme preference (`None` means the presentation default).
    pub fn theme(&self) -> Option<String> {
        self.get(PREF_THEME)
    }

    /// Persists the theme preference.
    pub fn set_theme(&self, theme: &str) -> AppResult<()> {
        self.set(PREF_THEME, theme)
    }

    /// Gallery layout preference.
    pub fn layout(&self) -> Option<String> {
        self.get(PREF_LAYOUT)
    }

    /// Persists the gallery layout preference.
    pub fn set_layout(&self, layout: &str) -> AppResult<()> {
        self.set(PREF_LAYOUT, layout)
    }

    /// Applies `change` to the latest persisted map and writes it back.
    ///
    /// The file is re-read under the exclusive lock, so keys written by other
    /// processes since this store was opened are kept. `change` reports
    /// whether it modified anything; unchanged maps are not rewritten. Memory
    /// is only updated once the write has succeeded.
    fn write_with(&self, change: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> AppResult<()> {
        let mut values = self.values.lock();
        let Some(path) = &self.path else {
            change(&mut values);
            return Ok(());
        };
        let io_err = |source| PreferenceError::Io {
            path: path.clone(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(io_err)?;
        lock_file.lock_exclusive().map_err(io_err)?;

        let result = read_map(path).and_then(|mut latest| {
            if change(&mut latest) {
                write_map(path, dir, &latest)?;
            }
            Ok(latest)
        });

        let _ = FileExt::unlock(&lock_file);
        *values = result?;
        Ok(())
    }
}

/// Reads a preference file; a missing or blank file is an empty map.
fn read_map(path: &Path) -> AppResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path).map_err(|source| PreferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let values = serde_json::from_str(&raw).map_err(|source| PreferenceError::Format {
        key: path.display().to_string(),
        source,
    })?;
    Ok(values)
}

/// Replaces `path` atomically with `values`.
fn write_map(path: &Path, dir: &Path, values: &BTreeMap<String, String>) -> AppResult<()> {
    let body = serde_json::to_vec_pretty(values).map_err(|source| PreferenceError::Format {
        key: path.display().to_string(),
        source,
    })?;

    let write = || {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok::<(), std::io::Error>(())
    };
    write().map_err(|source| PreferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::open(&dir.path().join("prefs.json")).unwrap();
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = PreferenceStore::open(&path).unwrap();
        store.set_theme("dark").unwrap();
        store.set_json("hiddenTags", &vec!["nsfw", "spoilers"]).unwrap();
        drop(store);

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.theme(), Some("dark".to_string()));
        let tags: Vec<String> = reopened.get_json("hiddenTags").unwrap().unwrap();
        assert_eq!(tags, vec!["nsfw", "spoilers"]);
    }

    #[test]
    fn test_writers_on_the_same_file_keep_each_others_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let first = PreferenceStore::open(&path).unwrap();
        let second = PreferenceStore::open(&path).unwrap();

        first.set_json("hiddenTags", &vec!["nsfw"]).unwrap();
        second.set("vault", "{}").unwrap();
        first.remove("layout").unwrap();

        let reopened = PreferenceStore::open(&path).unwrap();
        let tags: Vec<String> = reopened.get_json("hiddenTags").unwrap().unwrap();
        assert_eq!(tags, vec!["nsfw"]);
        assert_eq!(reopened.get("vault").as_deref(), Some("{}"));

        // Each write also refreshes the writer's view.
        assert!(second.get("hiddenTags").is_some());
        assert_eq!(first.get("vault").as_deref(), Some("{}"));
    }

    #[test]
    fn test_remove_absent_key_is_ok() {
        let store = PreferenceStore::in_memory();
        store.remove("layout").unwrap();
        store.set_layout("masonry").unwrap();
        store.remove("layout").unwrap();
        assert!(store.layout().is_none());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(PreferenceStore::open(&path).is_err());
    }

    #[test]
    fn test_bad_json_value_is_format_error() {
        let store = PreferenceStore::in_memory();
        store.set("hiddenTags", "not json").unwrap();
        let result: AppResult<Option<Vec<String>>> = store.get_json("hiddenTags");
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_keeps_previous_value() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::open(&path).unwrap();
        store.set_theme("light").unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o500)).unwrap();
        let result = store.set_theme("dark");
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o700)).unwrap();

        // Root ignores directory permissions; only assert when the write failed.
        if result.is_err() {
            assert_eq!(store.theme(), Some("light".to_string()));
        }
    }
}
