//! Row mapping and partition transactions for media records.
//!
//! Each [`Partition`] maps to its own table with identical columns. Tags are
//! stored as a JSON array in a TEXT column. Functions taking `&mut Connection`
//! run their statements in a single transaction: either every row lands or
//! none does.

use crate::constants::{HIDDEN_TABLE, PUBLIC_TABLE};
use crate::errors::{AppResult, DatabaseError};
use crate::media::{MediaFormat, MediaRecord, MediaType, Partition};
use rusqlite::{params, Connection, Row};
use tracing::debug;

const COLUMNS: &str = "id, url, type, format, name, tags, thumbnail, created_at, is_hidden";

/// Table backing a partition.
pub fn table_for(partition: Partition) -> &'static str {
    match partition {
        Partition::Public => PUBLIC_TABLE,
        Partition::Hidden => HIDDEN_TABLE,
    }
}

/// Undecoded row, kept separate so decoding errors can name the record id.
struct RawRow {
    id: String,
    url: String,
    media_type: String,
    format: String,
    name: String,
    tags: String,
    thumbnail: Option<String>,
    created_at: i64,
    is_hidden: bool,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            media_type: row.get(2)?,
            format: row.get(3)?,
            name: row.get(4)?,
            tags: row.get(5)?,
            thumbnail: row.get(6)?,
            created_at: row.get(7)?,
            is_hidden: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<MediaRecord, DatabaseError> {
        let format = MediaFormat::parse(&self.format).ok_or_else(|| DatabaseError::CorruptRecord {
            id: self.id.clone(),
            reason: format!("unknown format '{}'", self.format),
        })?;
        let tags: Vec<String> =
            serde_json::from_str(&self.tags).map_err(|e| DatabaseError::CorruptRecord {
                id: self.id.clone(),
                reason: format!("tags are not a JSON string array: {}", e),
            })?;

        Ok(MediaRecord {
            media_type: MediaType::from_hint(Some(&self.media_type)),
            id: self.id,
            url: self.url,
            format,
            name: self.name,
            tags,
            thumbnail: self.thumbnail,
            created_at: self.created_at,
            is_hidden: self.is_hidden,
        })
    }
}

/// Loads every record of a partition, newest first.
///
/// # Errors
///
/// Returns `DatabaseError::CorruptRecord` if a stored row cannot be decoded,
/// or a SQLite error if the query fails.
pub fn load_partition(conn: &Connection, partition: Partition) -> AppResult<Vec<MediaRecord>> {
    let table = table_for(partition);
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLUMNS} FROM {table} ORDER BY created_at DESC, id DESC"
        ))
        .map_err(DatabaseError::Sqlite)?;

    let rows = stmt
        .query_map([], RawRow::from_row)
        .map_err(DatabaseError::Sqlite)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(DatabaseError::Sqlite)?;

    let records = rows
        .into_iter()
        .map(RawRow::into_record)
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Loaded {} records from {}", records.len(), table);
    Ok(records)
}

/// Inserts one record. Fails if the id already exists in the partition.
pub fn insert_record(conn: &Connection, partition: Partition, record: &MediaRecord) -> AppResult<()> {
    let table = table_for(partition);
    let tags = encode_tags(record)?;
    conn.execute(
        &format!(
            "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            record.id,
            record.url,
            record.media_type.as_str(),
            record.format.as_str(),
            record.name,
            tags,
            record.thumbnail,
            record.created_at,
            record.is_hidden,
        ],
    )
    .map_err(DatabaseError::Sqlite)?;
    Ok(())
}

/// Overwrites the mutable columns of an existing record.
///
/// Returns `false` when no row has the record's id.
pub fn update_record(conn: &Connection, partition: Partition, record: &MediaRecord) -> AppResult<bool> {
    let table = table_for(partition);
    let tags = encode_tags(record)?;
    let changed = conn
        .execute(
            &format!(
                "UPDATE {table}
                 SET url = ?2, type = ?3, format = ?4, name = ?5, tags = ?6, thumbnail = ?7
                 WHERE id = ?1"
            ),
            params![
                record.id,
                record.url,
                record.media_type.as_str(),
                record.format.as_str(),
                record.name,
                tags,
                record.thumbnail,
            ],
        )
        .map_err(DatabaseError::Sqlite)?;
    Ok(changed > 0)
}

/// Deletes a record by id. Returns `false` when nothing was deleted.
pub fn delete_record(conn: &Connection, partition: Partition, id: &str) -> AppResult<bool> {
    let table = table_for(partition);
    let changed = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .map_err(DatabaseError::Sqlite)?;
    Ok(changed > 0)
}

/// Moves a record between partitions in one transaction.
///
/// `record` is written to `to` as given, so the caller sets `is_hidden`
/// beforehand.
///
/// # Errors
///
/// Returns an error, with neither table changed, if the source row is missing
/// or either statement fails.
pub fn move_record(
    conn: &mut Connection,
    from: Partition,
    to: Partition,
    record: &MediaRecord,
) -> AppResult<()> {
    let tx = conn.transaction().map_err(DatabaseError::Sqlite)?;
    if !delete_record(&tx, from, &record.id)? {
        return Err(DatabaseError::Sqlite(rusqlite::Error::QueryReturnedNoRows).into());
    }
    insert_record(&tx, to, record)?;
    tx.commit().map_err(DatabaseError::Sqlite)?;

    debug!(
        "Moved record {} from {} to {}",
        record.id,
        table_for(from),
        table_for(to)
    );
    Ok(())
}

/// Inserts a batch of records in one transaction.
pub fn insert_many(conn: &mut Connection, partition: Partition, records: &[MediaRecord]) -> AppResult<()> {
    let tx = conn.transaction().map_err(DatabaseError::Sqlite)?;
    for record in records {
        insert_record(&tx, partition, record)?;
    }
    tx.commit().map_err(DatabaseError::Sqlite)?;
    debug!("Inserted {} records into {}", records.len(), table_for(partition));
    Ok(())
}

/// Empties both partitions and inserts `public` in one transaction.
pub fn replace_all(conn: &mut Connection, public: &[MediaRecord]) -> AppResult<()> {
    let tx = conn.transaction().map_err(DatabaseError::Sqlite)?;
    tx.execute(&format!("DELETE FROM {PUBLIC_TABLE}"), [])
        .map_err(DatabaseError::Sqlite)?;
    tx.execute(&format!("DELETE FROM {HIDDEN_TABLE}"), [])
        .map_err(DatabaseError::Sqlite)?;
    for record in public {
        insert_record(&tx, Partition::Public, record)?;
    }
    tx.commit().map_err(DatabaseError::Sqlite)?;
    debug!("Replaced store contents with {} records", public.len());
    Ok(())
}

fn encode_tags(record: &MediaRecord) -> AppResult<String> {
    serde_json::to_string(&record.tags).map_err(|e| {
        DatabaseError::CorruptRecord {
            id: record.id.clone(),
            reason: e.to_string(),
        }
        .into()
    })
}
