use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::tempdir;

use mediashelf::config::Config;
use mediashelf::errors::{AppError, AppResult};

const VARS: &[&str] = &[
    "HOME",
    "MEDIASHELF_DIR",
    "MEDIASHELF_SESSION_DIR",
    "MEDIASHELF_UNLOCK_TTL",
    "MEDIASHELF_KDF_ITERATIONS",
    "MEDIASHELF_LOG_FORMAT",
];

/// Saves the variables this suite touches and restores them on drop.
struct EnvGuard(Vec<(&'static str, Option<String>)>);

impl EnvGuard {
    fn new() -> Self {
        let saved = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
        for key in VARS {
            env::remove_var(key);
        }
        EnvGuard(saved)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.0 {
            match value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_load_with_environment_vars() {
    let _guard = EnvGuard::new();
    let temp_dir = tempdir().unwrap();
    let data = temp_dir.path().join("data");
    let session = temp_dir.path().join("session");

    env::set_var("MEDIASHELF_DIR", &data);
    env::set_var("MEDIASHELF_SESSION_DIR", &session);
    env::set_var("MEDIASHELF_UNLOCK_TTL", "45");
    env::set_var("MEDIASHELF_KDF_ITERATIONS", "5000");
    env::set_var("MEDIASHELF_LOG_FORMAT", "JSON");

    let config = Config::load().unwrap();
    assert_eq!(config.data_dir, data);
    assert_eq!(config.session_dir, session);
    assert_eq!(config.unlock_ttl_minutes, 45);
    assert_eq!(config.kdf_iterations, 5000);
    assert_eq!(config.log_format, "json");
    assert_eq!(config.database_path(), data.join("mediashelf.db"));
    assert_eq!(config.preferences_path(), data.join("preferences.json"));
    assert_eq!(config.session_path(), session.join("session.json"));
}

#[test]
#[serial]
fn test_config_load_with_fallbacks() {
    let _guard = EnvGuard::new();
    let temp_dir = tempdir().unwrap();
    let home_path = temp_dir.path().to_string_lossy().to_string();
    env::set_var("HOME", &home_path);

    let config = Config::load().unwrap();

    let expected = PathBuf::from(&home_path)
        .join(".local")
        .join("share")
        .join("mediashelf");
    assert_eq!(config.data_dir, expected);
    assert!(config.session_dir.is_absolute());
    assert_eq!(config.unlock_ttl_minutes, 20);
    assert_eq!(config.kdf_iterations, 150_000);
    assert_eq!(config.log_format, "text");
}

#[test]
#[serial]
fn test_config_expands_tilde() {
    let _guard = EnvGuard::new();
    let temp_dir = tempdir().unwrap();
    env::set_var("HOME", temp_dir.path());
    env::set_var("MEDIASHELF_DIR", "~/shelf");

    let config = Config::load().unwrap();
    assert_eq!(config.data_dir, temp_dir.path().join("shelf"));
}

#[test]
#[serial]
fn test_config_rejects_bad_numbers() {
    let _guard = EnvGuard::new();
    let temp_dir = tempdir().unwrap();
    env::set_var("HOME", temp_dir.path());

    env::set_var("MEDIASHELF_UNLOCK_TTL", "soon");
    assert!(matches!(Config::load(), Err(AppError::Config(_))));

    env::set_var("MEDIASHELF_UNLOCK_TTL", "0");
    assert!(matches!(Config::load(), Err(AppError::Config(_))));

    env::remove_var("MEDIASHELF_UNLOCK_TTL");
    env::set_var("MEDIASHELF_KDF_ITERATIONS", "10");
    assert!(matches!(Config::load(), Err(AppError::Config(_))));
}

#[test]
#[serial]
fn test_config_validation() -> AppResult<()> {
    let valid = Config {
        data_dir: PathBuf::from("/absolute/data"),
        session_dir: PathBuf::from("/absolute/session"),
        ..Config::default()
    };
    valid.validate()?;

    let relative = Config {
        data_dir: PathBuf::from("relative/path"),
        ..valid.clone()
    };
    assert!(relative.validate().is_err());

    let empty_session = Config {
        session_dir: PathBuf::new(),
        ..valid.clone()
    };
    assert!(empty_session.validate().is_err());

    let bad_format = Config {
        log_format: "xml".to_string(),
        ..valid.clone()
    };
    match bad_format.validate() {
        Err(AppError::Config(msg)) => assert!(msg.contains("xml")),
        other => panic!("expected a config error, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_config_debug_redacts_paths() {
    let config = Config {
        data_dir: PathBuf::from("/home/someone/private"),
        session_dir: PathBuf::from("/run/user/1000/mediashelf"),
        ..Config::default()
    };
    let debug = format!("{:?}", config);
    assert!(!debug.contains("someone"));
    assert!(debug.contains("[REDACTED]"));
    assert!(debug.contains("unlock_ttl_minutes: 20"));
}
