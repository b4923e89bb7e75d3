/*!
# mediashelf

mediashelf is a local media-bookmarking store: save URLs, tag and classify
them, and keep sensitive ones in a hidden partition gated by a passcode.

## Core Features

- Two record partitions (public and hidden) mirrored to SQLite
- Optimistic mutations with rollback and reconciliation on storage failure
- Passcode vault with PBKDF2-SHA256 verifiers, remembered unlocks and auto-lock
- Import and export with URL deduplication and passcode-gated hidden restore

## Architecture

- `media`: record model and URL format classification
- `db`: SQLite schema, row mapping and the lazily opened handle
- `store`: the in-memory partitions and every mutation
- `crypto`: passcode hashing and verification
- `vault`: unlock state machine and the auto-lock timer
- `transfer`: export documents and the import flow
- `prefs`: durable and session-scoped key-value preferences
- `ops`: wiring used by the command-line interface
- `cli`, `config`, `errors`, `logging`, `constants`: ambient plumbing

## Usage Example

```rust,no_run
use mediashelf::db::DbHandle;
use mediashelf::media::MediaDraft;
use mediashelf::prefs::PreferenceStore;
use mediashelf::{Config, MediaStore};
use std::sync::Arc;

fn main() -> mediashelf::AppResult<()> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let prefs = Arc::new(PreferenceStore::open(&config.preferences_path())?);
    let store = MediaStore::open(DbHandle::new(config.database_path()), prefs)?;

    let record = store.add_item(MediaDraft::new("https://example.com/cat.png").with_tags(["cats"]))?;
    println!("saved {} as {}", record.url, record.format);
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application constants
pub mod constants;
/// Passcode hashing and verification
pub mod crypto;
/// SQLite persistence
pub mod db;
/// Error types and utilities for error handling
pub mod errors;
/// Tracing subscriber setup
pub mod logging;
/// Record model and format classification
pub mod media;
/// Operations composed for the command-line interface
pub mod ops;
/// Durable and session-scoped preference stores
pub mod prefs;
/// The media store
pub mod store;
/// Import and export
pub mod transfer;
/// Passcode vault state machine
pub mod vault;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{MediaDraft, MediaFormat, MediaRecord, MediaType};
pub use store::{ImportSummary, MediaStore, UpdateOptions};
pub use vault::{VaultController, VaultStatus};
