//! The media store: in-memory partitions mirrored to SQLite.
//!
//! Every mutation follows the same sequence:
//!
//! 1. take the writer lock of each partition it touches (public before hidden)
//! 2. apply the change in memory and recompute the derived indexes
//! 3. run one SQLite transaction
//! 4. on failure, roll back (adds) or reload the partition from storage
//!    (everything else), still under the writer lock, then return the error
//!
//! Readers never wait for storage: they see the optimistic state as soon as
//! step 2 completes. Bulk import and overwrite are the exception; they commit
//! first and only then touch memory.
//!
//! # Example
//!
//! ```no_run
//! use mediashelf::db::DbHandle;
//! use mediashelf::media::MediaDraft;
//! use mediashelf::prefs::PreferenceStore;
//! use mediashelf::store::MediaStore;
//! use std::sync::Arc;
//!
//! let prefs = Arc::new(PreferenceStore::in_memory());
//! let store = MediaStore::open(DbHandle::new("/tmp/mediashelf.db"), prefs)?;
//!
//! let record = store.add_item(MediaDraft::new("https://example.com/cat.png").with_tags(["cats"]))?;
//! assert!(store.hide_item(&record.id)?);
//! assert!(store.items().is_empty());
//! # Ok::<(), mediashelf::AppError>(())
//! ```

mod import;

pub use self::import::{ImportCandidate, ImportSummary};

use self::import::{normalize_candidate, unique_id};
use crate::constants::PREF_HIDDEN_TAGS;
use crate::db::{records, DbHandle};
use crate::errors::{AppError, AppResult};
use crate::media::{
    clean_tags, detect_format, name_from_url, normalize_url_key, MediaDraft, MediaFormat,
    MediaPatch, MediaRecord, Partition,
};
use crate::prefs::PreferenceStore;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Options for [`MediaStore::update_item`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Re-run format detection against the updated url and type.
    pub recompute_format: bool,
}

/// Records of one partition plus the indexes derived from them.
#[derive(Debug, Default)]
struct PartitionState {
    items: Vec<MediaRecord>,
    all_tags: Vec<String>,
    all_formats: Vec<MediaFormat>,
}

impl PartitionState {
    fn new(items: Vec<MediaRecord>) -> Self {
        let mut state = Self {
            items,
            ..Self::default()
        };
        state.recompute();
        state
    }

    fn recompute(&mut self) {
        let tags: BTreeSet<&str> = self
            .items
            .iter()
            .flat_map(|r| r.tags.iter().map(String::as_str))
            .collect();
        self.all_tags = tags.into_iter().map(str::to_string).collect();

        let mut formats: Vec<MediaFormat> = Vec::new();
        for record in &self.items {
            if !formats.contains(&record.format) {
                formats.push(record.format);
            }
        }
        formats.sort_by_key(|f| f.as_str());
        self.all_formats = formats;
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|r| r.id == id)
    }

    fn prepend(&mut self, record: MediaRecord) {
        self.items.insert(0, record);
        self.recompute();
    }

    fn take(&mut self, id: &str) -> Option<MediaRecord> {
        let pos = self.position(id)?;
        let record = self.items.remove(pos);
        self.recompute();
        Some(record)
    }
}

/// Owner of all media records.
///
/// `MediaStore` is `Send + Sync`; share it behind an `Arc`. Accessors return
/// owned snapshots.
pub struct MediaStore {
    handle: DbHandle,
    prefs: Arc<PreferenceStore>,
    public: RwLock<PartitionState>,
    hidden: RwLock<PartitionState>,
    hidden_tags: RwLock<Vec<String>>,
    public_writer: Mutex<()>,
    hidden_writer: Mutex<()>,
    // Serializes id generation across partitions.
    id_guard: Mutex<()>,
}

impl std::fmt::Debug for MediaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStore")
            .field("path", &self.handle.path())
            .field("public", &self.public.read().items.len())
            .field("hidden", &self.hidden.read().items.len())
            .finish()
    }
}

impl MediaStore {
    /// Opens the store: loads both partitions and the hidden-tag list.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Unavailable` if the database location cannot be
    /// used, or any error loading the partitions. A malformed hidden-tag
    /// preference is logged and treated as empty.
    pub fn open(handle: DbHandle, prefs: Arc<PreferenceStore>) -> AppResult<Self> {
        let (public, hidden) = {
            let db = handle.get()?;
            let conn = db.get_conn()?;
            (
                records::load_partition(&conn, Partition::Public)?,
                records::load_partition(&conn, Partition::Hidden)?,
            )
        };

        let hidden_tags = match prefs.get_json::<Vec<String>>(PREF_HIDDEN_TAGS) {
            Ok(tags) => clean_tags(tags.unwrap_or_default()),
            Err(e) => {
                warn!("Ignoring unreadable hidden tag list: {}", e);
                Vec::new()
            }
        };

        info!(
            "Media store opened with {} public and {} hidden records",
            public.len(),
            hidden.len()
        );

        Ok(Self {
            handle,
            prefs,
            public: RwLock::new(PartitionState::new(public)),
            hidden: RwLock::new(PartitionState::new(hidden)),
            hidden_tags: RwLock::new(hidden_tags),
            public_writer: Mutex::new(()),
            hidden_writer: Mutex::new(()),
            id_guard: Mutex::new(()),
        })
    }

    /// The lazily opened database behind this store.
    pub fn handle(&self) -> &DbHandle {
        &self.handle
    }

    /// Public records, newest first.
    pub fn items(&self) -> Vec<MediaRecord> {
        self.public.read().items.clone()
    }

    pub fn hidden_items(&self) -> Vec<MediaRecord> {
        self.hidden.read().items.clone()
    }

    /// Public records carrying none of the hidden tags.
    pub fn visible_items(&self) -> Vec<MediaRecord> {
        let hidden_tags = self.hidden_tags.read();
        self.public
            .read()
            .items
            .iter()
            .filter(|r| !r.has_any_tag(&hidden_tags))
            .cloned()
            .collect()
    }

    /// Sorted, distinct tags of the public partition.
    pub fn all_tags(&self) -> Vec<String> {
        self.public.read().all_tags.clone()
    }

    /// Distinct formats of the public partition, sorted by name.
    pub fn all_formats(&self) -> Vec<MediaFormat> {
        self.public.read().all_formats.clone()
    }

    pub fn hidden_tags(&self) -> Vec<String> {
        self.hidden_tags.read().clone()
    }

    /// Looks a record up in either partition.
    pub fn get(&self, id: &str) -> Option<MediaRecord> {
        let public = self.public.read();
        if let Some(pos) = public.position(id) {
            return Some(public.items[pos].clone());
        }
        drop(public);
        let hidden = self.hidden.read();
        hidden.position(id).map(|pos| hidden.items[pos].clone())
    }

    /// Adds a public record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank URL (nothing changes), or the
    /// storage error after the optimistic record has been removed again.
    pub fn add_item(&self, draft: MediaDraft) -> AppResult<MediaRecord> {
        self.add_to(Partition::Public, draft)
    }

    /// Adds a record straight into the hidden partition.
    pub fn add_hidden_item(&self, draft: MediaDraft) -> AppResult<MediaRecord> {
        self.add_to(Partition::Hidden, draft)
    }

    fn add_to(&self, partition: Partition, draft: MediaDraft) -> AppResult<MediaRecord> {
        let url = draft.url.trim().to_string();
        if url.is_empty() {
            return Err(AppError::Validation("url is required".to_string()));
        }

        let _writer = self.writer(partition).lock();

        let record = {
            let _ids = self.id_guard.lock();
            let now_ms = Utc::now().timestamp_millis();
            let id = unique_id(&now_ms.to_string(), &self.taken_ids());
            let media_type = draft.media_type.unwrap_or_default();
            let record = MediaRecord {
                id,
                format: detect_format(&url, media_type),
                name: draft
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| name_from_url(&url)),
                url,
                media_type,
                tags: clean_tags(&draft.tags),
                thumbnail: draft
                    .thumbnail
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                created_at: now_ms,
                is_hidden: partition.is_hidden(),
            };
            self.state(partition).write().prepend(record.clone());
            record
        };

        match self.with_conn(|conn| records::insert_record(conn, partition, &record)) {
            Ok(()) => {
                info!("Added record {} ({})", record.id, record.format);
                Ok(record)
            }
            Err(e) => {
                self.state(partition).write().take(&record.id);
                warn!("Rolled back add of {}: {}", record.id, e);
                Err(e)
            }
        }
    }

    /// Deletes a public record. Returns `false` if no such record exists.
    pub fn delete_item(&self, id: &str) -> AppResult<bool> {
        let _writer = self.public_writer.lock();

        if self.public.write().take(id).is_none() {
            debug!("Delete of unknown record {}", id);
            return Ok(false);
        }

        match self.with_conn(|conn| records::delete_record(conn, Partition::Public, id)) {
            Ok(_) => {
                info!("Deleted record {}", id);
                Ok(true)
            }
            Err(e) => {
                warn!("Delete of {} failed, reconciling: {}", id, e);
                self.reconcile(Partition::Public);
                Err(e)
            }
        }
    }

    /// Applies `patch` to a public record.
    ///
    /// `id` and `createdAt` never change. The format is kept unless
    /// `options.recompute_format` is set. Returns `Ok(None)` if the record does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank URL in the patch, or the
    /// storage error after reconciling.
    pub fn update_item(
        &self,
        id: &str,
        patch: MediaPatch,
        options: UpdateOptions,
    ) -> AppResult<Option<MediaRecord>> {
        if matches!(patch.url.as_deref().map(str::trim), Some("")) {
            return Err(AppError::Validation("url cannot be empty".to_string()));
        }

        let _writer = self.public_writer.lock();

        let updated = {
            let mut state = self.public.write();
            let Some(pos) = state.position(id) else {
                return Ok(None);
            };
            let record = &mut state.items[pos];
            apply_patch(record, patch, options);
            let updated = record.clone();
            state.recompute();
            updated
        };

        match self.with_conn(|conn| records::update_record(conn, Partition::Public, &updated)) {
            Ok(true) => {
                info!("Updated record {}", id);
                Ok(Some(updated))
            }
            Ok(false) => {
                warn!("Record {} missing from storage, reconciling", id);
                self.reconcile(Partition::Public);
                Ok(None)
            }
            Err(e) => {
                warn!("Update of {} failed, reconciling: {}", id, e);
                self.reconcile(Partition::Public);
                Err(e)
            }
        }
    }

    /// Moves a public record into the hidden partition.
    pub fn hide_item(&self, id: &str) -> AppResult<bool> {
        self.move_item(id, Partition::Public, Partition::Hidden)
    }

    /// Moves a hidden record back into the public partition.
    pub fn unhide_item(&self, id: &str) -> AppResult<bool> {
        self.move_item(id, Partition::Hidden, Partition::Public)
    }

    fn move_item(&self, id: &str, from: Partition, to: Partition) -> AppResult<bool> {
        let _public = self.public_writer.lock();
        let _hidden = self.hidden_writer.lock();

        let Some(mut record) = self.state(from).write().take(id) else {
            debug!("Move of unknown record {}", id);
            return Ok(false);
        };
        record.is_hidden = to.is_hidden();
        self.state(to).write().prepend(record.clone());

        match self.with_conn(|conn| records::move_record(conn, from, to, &record)) {
            Ok(()) => {
                info!("Record {} is now {}", id, if to.is_hidden() { "hidden" } else { "public" });
                Ok(true)
            }
            Err(e) => {
                warn!("Move of {} failed, reconciling: {}", id, e);
                self.reconcile(Partition::Public);
                self.reconcile(Partition::Hidden);
                Err(e)
            }
        }
    }

    /// Adds records from an import, skipping URLs already present.
    ///
    /// URLs are compared trimmed and lowercased, against the public partition
    /// and within the batch. Accepted records are written in one transaction
    /// and only then merged into memory, newest first.
    ///
    /// # Errors
    ///
    /// Returns the storage error; in-memory state is untouched in that case.
    pub fn import_items(&self, candidates: &[ImportCandidate]) -> AppResult<ImportSummary> {
        self.import_into(Partition::Public, candidates)
    }

    /// Restores hidden records from an import, skipping URLs already hidden.
    ///
    /// Works like [`import_items`](Self::import_items) against the hidden
    /// partition. `createdAt` and ids from the file are kept when present;
    /// ids stay unique across both partitions.
    ///
    /// # Errors
    ///
    /// Returns the storage error; in-memory state is untouched in that case.
    pub fn import_hidden_items(&self, candidates: &[ImportCandidate]) -> AppResult<ImportSummary> {
        self.import_into(Partition::Hidden, candidates)
    }

    fn import_into(
        &self,
        partition: Partition,
        candidates: &[ImportCandidate],
    ) -> AppResult<ImportSummary> {
        let _writer = self.writer(partition).lock();
        let _ids = self.id_guard.lock();

        let now_ms = Utc::now().timestamp_millis();
        let mut seen_urls: HashSet<String> = self
            .state(partition)
            .read()
            .items
            .iter()
            .map(|r| normalize_url_key(&r.url))
            .collect();
        let mut taken = self.taken_ids();

        let mut summary = ImportSummary::default();
        let mut accepted = Vec::new();
        for candidate in candidates {
            let key = match candidate.url.as_deref().map(normalize_url_key) {
                Some(key) if !key.is_empty() => key,
                _ => {
                    summary.skipped += 1;
                    continue;
                }
            };
            if !seen_urls.insert(key) {
                summary.skipped += 1;
                continue;
            }
            match normalize_candidate(candidate, now_ms, &mut taken) {
                Some(mut record) => {
                    record.is_hidden = partition.is_hidden();
                    accepted.push(record);
                }
                None => summary.skipped += 1,
            }
        }
        summary.added = accepted.len();

        if accepted.is_empty() {
            debug!("Import added nothing ({} skipped)", summary.skipped);
            return Ok(summary);
        }

        self.with_conn(|conn| records::insert_many(conn, partition, &accepted))?;

        let mut state = self.state(partition).write();
        state.items.extend(accepted);
        state.items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        state.recompute();

        info!(
            "Imported {} records into {} ({} skipped)",
            summary.added,
            records::table_for(partition),
            summary.skipped
        );
        Ok(summary)
    }

    /// Replaces everything with `candidates`.
    ///
    /// Both partitions are cleared and the candidates written in one
    /// transaction. URLs are not deduplicated but ids are made unique. The
    /// hidden-tag list is cleared. Returns the number of records written.
    pub fn overwrite_with_items(&self, candidates: &[ImportCandidate]) -> AppResult<usize> {
        let _public = self.public_writer.lock();
        let _hidden = self.hidden_writer.lock();

        let now_ms = Utc::now().timestamp_millis();
        let mut taken = HashSet::new();
        let mut replacement: Vec<MediaRecord> = candidates
            .iter()
            .filter_map(|c| normalize_candidate(c, now_ms, &mut taken))
            .collect();
        replacement.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.with_conn(|conn| records::replace_all(conn, &replacement))?;

        let count = replacement.len();
        *self.public.write() = PartitionState::new(replacement);
        *self.hidden.write() = PartitionState::default();

        self.hidden_tags.write().clear();
        if let Err(e) = self.prefs.remove(PREF_HIDDEN_TAGS) {
            warn!("Could not clear hidden tag preference: {}", e);
        }

        info!("Store overwritten with {} records", count);
        Ok(count)
    }

    /// Adds a tag to the hidden-tag list. Persistence is best-effort.
    pub fn hide_tag(&self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        let mut tags = self.hidden_tags.write();
        if tags.iter().any(|t| t == tag) {
            return;
        }
        tags.push(tag.to_string());
        self.persist_hidden_tags(&tags);
    }

    /// Removes a tag from the hidden-tag list. Persistence is best-effort.
    pub fn unhide_tag(&self, tag: &str) {
        let tag = tag.trim();
        let mut tags = self.hidden_tags.write();
        let before = tags.len();
        tags.retain(|t| t != tag);
        if tags.len() != before {
            self.persist_hidden_tags(&tags);
        }
    }

    /// Reloads both partitions from storage, discarding in-memory state.
    pub fn reload(&self) -> AppResult<()> {
        let _public = self.public_writer.lock();
        let _hidden = self.hidden_writer.lock();

        let (public, hidden) = self.with_conn(|conn| {
            Ok((
                records::load_partition(conn, Partition::Public)?,
                records::load_partition(conn, Partition::Hidden)?,
            ))
        })?;
        *self.public.write() = PartitionState::new(public);
        *self.hidden.write() = PartitionState::new(hidden);
        debug!("Store reloaded from storage");
        Ok(())
    }

    /// Closes the database handle. The next operation reopens it.
    pub fn close_db(&self) {
        self.handle.close();
    }

    fn writer(&self, partition: Partition) -> &Mutex<()> {
        match partition {
            Partition::Public => &self.public_writer,
            Partition::Hidden => &self.hidden_writer,
        }
    }

    fn state(&self, partition: Partition) -> &RwLock<PartitionState> {
        match partition {
            Partition::Public => &self.public,
            Partition::Hidden => &self.hidden,
        }
    }

    fn taken_ids(&self) -> HashSet<String> {
        let mut ids: HashSet<String> = self.public.read().items.iter().map(|r| r.id.clone()).collect();
        ids.extend(self.hidden.read().items.iter().map(|r| r.id.clone()));
        ids
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> AppResult<T>) -> AppResult<T> {
        let db = self.handle.get()?;
        let mut conn = db.get_conn()?;
        f(&mut conn)
    }

    /// Replaces a partition with what storage holds. Callers hold its writer
    /// lock. If storage cannot be read either, memory is left as is.
    fn reconcile(&self, partition: Partition) {
        match self.with_conn(|conn| records::load_partition(conn, partition)) {
            Ok(items) => {
                debug!("Reconciled {} records from {}", items.len(), records::table_for(partition));
                *self.state(partition).write() = PartitionState::new(items);
            }
            Err(e) => {
                error!(
                    "Reconciliation of {} failed, in-memory state may be stale: {}",
                    records::table_for(partition),
                    e
                );
            }
        }
    }

    fn persist_hidden_tags(&self, tags: &[String]) {
        if let Err(e) = self.prefs.set_json(PREF_HIDDEN_TAGS, &tags) {
            warn!("Could not persist hidden tags: {}", e);
        }
    }
}

fn apply_patch(record: &mut MediaRecord, patch: MediaPatch, options: UpdateOptions) {
    if let Some(url) = patch.url {
        record.url = url.trim().to_string();
    }
    if let Some(media_type) = patch.media_type {
        record.media_type = media_type;
    }
    if let Some(name) = patch.name {
        let name = name.trim();
        record.name = if name.is_empty() {
            name_from_url(&record.url)
        } else {
            name.to_string()
        };
    }
    if let Some(tags) = patch.tags {
        record.tags = clean_tags(&tags);
    }
    if let Some(thumbnail) = patch.thumbnail {
        record.thumbnail = thumbnail
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }
    if options.recompute_format {
        record.format = detect_format(&record.url, record.media_type);
    }
}
