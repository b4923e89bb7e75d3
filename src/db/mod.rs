//! SQLite persistence for media records.
//!
//! The database holds two tables, one per [`Partition`](crate::media::Partition).
//! Connections come from an r2d2 pool so the store can be shared across
//! threads while SQLite serializes writers internally.
//!
//! # Module Structure
//!
//! - `schema`: Table definitions and versioned upgrades
//! - `records`: Row mapping and per-partition transactions
//! - `handle`: Lazily opened, explicitly closable database handle
//!
//! # Example
//!
//! ```no_run
//! use mediashelf::db::Database;
//! use std::path::Path;
//!
//! let db = Database::open(Path::new("/tmp/mediashelf.db"))?;
//! db.initialize_schema()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod handle;
pub mod records;
pub mod schema;

pub use self::handle::{destroy_database, DbHandle};

use crate::constants::DB_POOL_SIZE;
use crate::errors::{AppResult, DatabaseError};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Type alias for a pooled SQLite connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database handle with connection pooling.
///
/// Cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Opens or creates a SQLite database.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory is missing (`DatabaseError::Unavailable`)
    /// - Database file cannot be opened or created
    /// - Connection pool cannot be initialized
    pub fn open(db_path: &Path) -> AppResult<Self> {
        debug!("Opening database at: {:?}", db_path);

        match db_path.parent() {
            Some(dir) if dir.as_os_str().is_empty() || dir.is_dir() => {}
            _ => {
                return Err(DatabaseError::Unavailable {
                    path: db_path.to_path_buf(),
                    reason: "parent directory does not exist".to_string(),
                }
                .into())
            }
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(DB_POOL_SIZE)
            .connection_customizer(Box::new(SqliteConfig))
            .build(manager)
            .map_err(DatabaseError::Pool)?;

        // Surface open failures now rather than on the first query.
        let conn = pool.get().map_err(DatabaseError::Pool)?;
        conn.execute_batch("SELECT 1").map_err(DatabaseError::Sqlite)?;
        drop(conn);

        info!("Database opened successfully");
        Ok(Database { pool })
    }

    /// Gets a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or the pool is exhausted.
    pub fn get_conn(&self) -> AppResult<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::Pool(e).into())
    }

    /// Creates or upgrades all tables. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn initialize_schema(&self) -> AppResult<()> {
        let conn = self.get_conn()?;
        schema::create_tables(&conn)?;
        info!("Database schema initialized");
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

/// Per-connection pragmas.
#[derive(Debug)]
struct SqliteConfig;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for SqliteConfig {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_open_and_connect() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).unwrap();
        let conn = db.get_conn().unwrap();

        let result: i32 = conn
            .query_row("SELECT 1 + 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(result, 2);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("missing").join("test.db");
        let result = Database::open(&db_path);
        assert!(matches!(
            result,
            Err(crate::errors::AppError::Database(
                DatabaseError::Unavailable { .. }
            ))
        ));
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).unwrap();
        db.initialize_schema().unwrap();
        db.initialize_schema().unwrap();
    }
}
