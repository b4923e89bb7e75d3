use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

mod test_helpers;
use test_helpers::base_mediashelf_command;

fn add(dir: &Path, args: &[&str]) -> String {
    let output = base_mediashelf_command(dir)
        .arg("add")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
#[serial]
fn test_cli_requires_subcommand() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
#[serial]
fn test_cli_add_and_list() {
    let dir = tempdir().unwrap();
    let id = add(
        dir.path(),
        &["https://cdn.test/cat.png", "-t", "cats", "-t", "pets"],
    );
    assert!(!id.is_empty());

    base_mediashelf_command(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id))
        .stdout(predicate::str::contains("image"))
        .stdout(predicate::str::contains("[cats, pets]"));

    let output = base_mediashelf_command(dir.path())
        .args(["list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["id"], id.as_str());
    assert_eq!(records[0]["format"], "image");
    assert_eq!(records[0]["name"], "cdn.test");
}

#[test]
#[serial]
fn test_cli_add_requires_tag() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .args(["add", "https://cdn.test/cat.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tag"));
}

#[test]
#[serial]
fn test_cli_add_blank_url_fails() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .args(["add", "   ", "-t", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("url is required"));
}

#[test]
#[serial]
fn test_cli_update_and_delete() {
    let dir = tempdir().unwrap();
    let id = add(dir.path(), &["https://a.test/page", "-t", "old"]);

    base_mediashelf_command(dir.path())
        .args(["update", &id, "--url", "https://a.test/clip.mp4", "--recompute-format"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Updated {} (video)", id)));

    base_mediashelf_command(dir.path())
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted {}", id)));

    base_mediashelf_command(dir.path())
        .args(["delete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no record with id"));
}

#[test]
#[serial]
fn test_cli_hidden_tags_filter_list() {
    let dir = tempdir().unwrap();
    add(dir.path(), &["https://a.test/one", "-t", "work"]);
    add(dir.path(), &["https://a.test/two", "-t", "private"]);

    base_mediashelf_command(dir.path())
        .args(["tags", "hide", "private"])
        .assert()
        .success();

    base_mediashelf_command(dir.path())
        .args(["tags", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("private (hidden)"))
        .stdout(predicate::str::contains("work"));

    base_mediashelf_command(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://a.test/one"))
        .stdout(predicate::str::contains("https://a.test/two").not());

    base_mediashelf_command(dir.path())
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://a.test/two"));
}

#[test]
#[serial]
fn test_cli_vault_hide_and_unhide() {
    let dir = tempdir().unwrap();
    let id = add(dir.path(), &["https://a.test/secret.png", "-t", "s"]);

    base_mediashelf_command(dir.path())
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: not configured"));

    base_mediashelf_command(dir.path())
        .args(["list", "--hidden"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vault setup"));

    base_mediashelf_command(dir.path())
        .args(["vault", "setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vault passcode set"));

    base_mediashelf_command(dir.path())
        .args(["hide", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Hid {}", id)));

    base_mediashelf_command(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id).not());

    base_mediashelf_command(dir.path())
        .args(["list", "--hidden"])
        .env("MEDIASHELF_PASSCODE", "99999")
        .assert()
        .failure()
        .stderr(predicate::str::contains("incorrect passcode"));

    base_mediashelf_command(dir.path())
        .args(["list", "--hidden"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://a.test/secret.png"));

    base_mediashelf_command(dir.path())
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: locked"))
        .stdout(predicate::str::contains("Hidden records: 1"));

    base_mediashelf_command(dir.path())
        .args(["unhide", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Unhid {}", id)));

    base_mediashelf_command(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));
}

#[test]
#[serial]
fn test_cli_remembered_unlock_spans_commands() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .args(["vault", "setup"])
        .assert()
        .success();

    base_mediashelf_command(dir.path())
        .args(["vault", "remember", "on"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remember: on"));

    base_mediashelf_command(dir.path())
        .args(["vault", "unlock", "--ttl", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unlocked until"));

    base_mediashelf_command(dir.path())
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: unlocked until"));

    base_mediashelf_command(dir.path())
        .args(["vault", "lock"])
        .assert()
        .success();

    base_mediashelf_command(dir.path())
        .args(["vault", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: locked"));
}

#[test]
#[serial]
fn test_cli_export_and_import() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    let export_path = source.path().join("export.json");

    add(source.path(), &["https://a.test/public.jpg", "-t", "p"]);
    base_mediashelf_command(source.path())
        .args(["vault", "setup"])
        .assert()
        .success();
    add(
        source.path(),
        &["https://a.test/private.mp4", "-t", "s", "--hidden"],
    );

    base_mediashelf_command(source.path())
        .arg("export")
        .arg(&export_path)
        .arg("--include-hidden")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 records and 1 hidden"));

    base_mediashelf_command(target.path())
        .arg("import")
        .arg(&export_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 1, skipped 0"))
        .stdout(predicate::str::contains("Hidden: restored 0, skipped 1"));

    base_mediashelf_command(target.path())
        .arg("import")
        .arg(&export_path)
        .arg("--with-passcode")
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 0, skipped 1"))
        .stdout(predicate::str::contains("Hidden: restored 1, skipped 0"))
        .stdout(predicate::str::contains("Vault passcode set from the imported vault"));

    base_mediashelf_command(target.path())
        .args(["list", "--hidden"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://a.test/private.mp4"));
}

#[test]
#[serial]
fn test_cli_import_rejects_unknown_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("odd.json");
    fs::write(&path, r#"{"records": []}"#).unwrap();

    base_mediashelf_command(dir.path())
        .arg("import")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized import document"));
}

#[test]
#[serial]
fn test_cli_prefs() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .args(["prefs", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::diff("system\n"));

    base_mediashelf_command(dir.path())
        .args(["prefs", "theme", "dark"])
        .assert()
        .success();

    base_mediashelf_command(dir.path())
        .args(["prefs", "theme"])
        .assert()
        .success()
        .stdout(predicate::str::diff("dark\n"));
}

#[test]
#[serial]
fn test_cli_destroy() {
    let dir = tempdir().unwrap();
    add(dir.path(), &["https://a.test/x", "-t", "x"]);
    let db_path = dir.path().join("data").join("mediashelf.db");
    assert!(db_path.exists());

    base_mediashelf_command(dir.path())
        .arg("destroy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert!(db_path.exists());

    base_mediashelf_command(dir.path())
        .args(["destroy", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database deleted"));
    assert!(!db_path.exists());

    base_mediashelf_command(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
#[serial]
fn test_cli_invalid_config_exits_with_code_2() {
    let dir = tempdir().unwrap();
    base_mediashelf_command(dir.path())
        .env("MEDIASHELF_LOG_FORMAT", "xml")
        .args(["tags", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}
