//! Lazily opened, explicitly closable database handle.
//!
//! The store never holds a [`Database`] directly. It asks a [`DbHandle`] for
//! one on every operation, which opens the pool and upgrades the schema the
//! first time and after each [`DbHandle::close`].

use super::Database;
use crate::errors::{AppResult, DatabaseError};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner of the connection pool for one database file.
#[derive(Debug)]
pub struct DbHandle {
    path: PathBuf,
    db: Mutex<Option<Database>>,
}

impl DbHandle {
    /// Creates a closed handle for `path`. Nothing touches the disk yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            db: Mutex::new(None),
        }
    }

    /// Database file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the open database, opening it and initializing the schema if
    /// needed. Concurrent callers share one open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Unavailable` when the storage location cannot be
    /// used, or any error from opening the pool or creating tables.
    pub fn get(&self) -> AppResult<Database> {
        let mut guard = self.db.lock();
        if let Some(db) = guard.as_ref() {
            return Ok(db.clone());
        }

        debug!("Opening database handle at {:?}", self.path);
        let db = Database::open(&self.path)?;
        db.initialize_schema()?;
        *guard = Some(db.clone());
        Ok(db)
    }

    /// Drops the pool. Connections already checked out stay valid until
    /// returned; the next [`get`](Self::get) reopens.
    pub fn close(&self) {
        if self.db.lock().take().is_some() {
            info!("Database handle closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.db.lock().is_some()
    }
}

/// Deletes the database file and its WAL/SHM companions.
///
/// # Errors
///
/// Returns `DatabaseError::StillOpen` if the handle is open, or an I/O error if
/// a file exists but cannot be removed.
pub fn destroy_database(handle: &DbHandle) -> AppResult<()> {
    if handle.is_open() {
        return Err(DatabaseError::StillOpen("destroying the database".to_string()).into());
    }

    let base = handle.path().as_os_str().to_owned();
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = base.clone();
        name.push(suffix);
        match fs::remove_file(PathBuf::from(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    info!("Database destroyed at {:?}", handle.path());
    Ok(())
}
