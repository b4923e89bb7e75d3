#![allow(dead_code)]

use assert_cmd::Command;
use mediashelf::db::DbHandle;
use mediashelf::prefs::PreferenceStore;
use mediashelf::store::MediaStore;
use mediashelf::vault::VaultController;
use std::path::Path;
use std::sync::Arc;

pub const TEST_PASSCODE: &str = "24680";
/// Cheap PBKDF2 cost so tests do not spend seconds per derivation.
pub const TEST_ITERATIONS: u32 = 1_000;

/// Creates a `Command` for the `mediashelf` binary with a clean, non-interactive
/// environment rooted in `dir`.
pub fn base_mediashelf_command(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mediashelf").expect("mediashelf binary not built");
    configure_mediashelf_command(&mut cmd, dir);
    cmd
}

/// Applies the standard non-interactive environment to an existing `Command`.
pub fn configure_mediashelf_command(cmd: &mut Command, dir: &Path) {
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
        cmd.env("PATH", path);
    }
    if let Ok(tmpdir) = std::env::var("TMPDIR") {
        cmd.env("TMPDIR", tmpdir);
    }
    cmd.env("HOME", dir)
        .env("MEDIASHELF_DIR", dir.join("data"))
        .env("MEDIASHELF_SESSION_DIR", dir.join("session"))
        .env("MEDIASHELF_KDF_ITERATIONS", TEST_ITERATIONS.to_string())
        .env("MEDIASHELF_PASSCODE", TEST_PASSCODE);
}

/// Durable preferences, session store, media store and vault rooted in `dir`.
pub struct Fixture {
    pub prefs: Arc<PreferenceStore>,
    pub session: Arc<PreferenceStore>,
    pub store: MediaStore,
    pub vault: VaultController,
}

pub fn open_fixture(dir: &Path) -> Fixture {
    std::fs::create_dir_all(dir).unwrap();
    let prefs = Arc::new(PreferenceStore::open(&dir.join("preferences.json")).unwrap());
    let session = Arc::new(PreferenceStore::open(&dir.join("session").join("session.json")).unwrap());
    let store = MediaStore::open(DbHandle::new(dir.join("mediashelf.db")), prefs.clone()).unwrap();
    let vault = VaultController::load(prefs.clone(), session.clone(), TEST_ITERATIONS).unwrap();
    Fixture {
        prefs,
        session,
        store,
        vault,
    }
}

/// Installs a trigger that aborts every `operation` (INSERT, UPDATE or DELETE)
/// on `table`.
pub fn inject_failure(store: &MediaStore, operation: &str, table: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{op}_{table} BEFORE {op} ON {table}
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        op = operation,
        table = table
    );
    store
        .handle()
        .get()
        .unwrap()
        .get_conn()
        .unwrap()
        .execute_batch(&sql)
        .unwrap();
}

pub fn clear_failure(store: &MediaStore, operation: &str, table: &str) {
    let sql = format!("DROP TRIGGER IF EXISTS fail_{}_{}", operation, table);
    store
        .handle()
        .get()
        .unwrap()
        .get_conn()
        .unwrap()
        .execute_batch(&sql)
        .unwrap();
}
