//! Database schema definitions and upgrades.
//!
//! The schema version lives in `PRAGMA user_version`. Each version only adds
//! tables, so opening a database written by an older version creates what is
//! missing and never touches existing rows.
//!
//! | version | adds                 |
//! |---------|----------------------|
//! | 1       | `media_public`       |
//! | 2       | `media_hidden`       |

use crate::constants::{HIDDEN_TABLE, PUBLIC_TABLE};
use crate::errors::{AppResult, DatabaseError};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
///
/// Increment this whenever a partition or column is added.
pub const SCHEMA_VERSION: i32 = 2;

/// Creates or upgrades all tables to [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns an error if any DDL statement fails. Upgrades run inside one
/// transaction, so a failure leaves the previous version intact.
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    let current = get_schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        debug!("Schema version already at {}", current);
        return Ok(());
    }

    debug!("Upgrading schema from {} to {}", current, SCHEMA_VERSION);
    let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;

    if current < 1 {
        tx.execute_batch(&partition_ddl(PUBLIC_TABLE))
            .map_err(DatabaseError::Sqlite)?;
    }
    if current < 2 {
        tx.execute_batch(&partition_ddl(HIDDEN_TABLE))
            .map_err(DatabaseError::Sqlite)?;
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(DatabaseError::Sqlite)?;
    tx.commit().map_err(DatabaseError::Sqlite)?;

    info!("Database schema at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Reads `PRAGMA user_version` (0 for a fresh database).
pub fn get_schema_version(conn: &Connection) -> AppResult<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| DatabaseError::Sqlite(e).into())
}

fn partition_ddl(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            url TEXT NOT NULL,
            type TEXT NOT NULL,
            format TEXT NOT NULL,
            name TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            thumbnail TEXT,
            created_at INTEGER NOT NULL,
            is_hidden INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at DESC);
        "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        assert!(table_exists(&conn, PUBLIC_TABLE));
        assert!(table_exists(&conn, HIDDEN_TABLE));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_create_tables_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_upgrade_from_version_one_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&partition_ddl(PUBLIC_TABLE)).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO media_public (id, url, type, format, name, tags, created_at)
             VALUES ('1', 'https://example.com', 'other', 'website', 'example.com', '[]', 1)",
            [],
        )
        .unwrap();
        assert!(!table_exists(&conn, HIDDEN_TABLE));

        create_tables(&conn).unwrap();

        assert!(table_exists(&conn, HIDDEN_TABLE));
        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM media_public", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_primary_key_rejects_duplicate_ids() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let insert = "INSERT INTO media_hidden (id, url, type, format, name, created_at)
                      VALUES ('dup', 'u', 'other', 'other', 'n', 1)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
