//! Configuration loading and path resolution tests
//!
//! Tests that touch INQ_CONFIG or INQ_ROOT_FOLDER are marked #[serial] so
//! environment changes never race.

use inq_common::config::{
    is_valid_key, resolve_database_path, resolve_root_folder, TomlConfig, CONFIG_ENV_VAR,
    DATABASE_FILE_NAME, ROOT_FOLDER_ENV_VAR,
};
use inq_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.google.dev_key.is_none());
    assert!(config.shodan.api_key.is_none());
    assert_eq!(config.scan.workers, 4);
    assert_eq!(config.scan.asset_timeout_secs, 300);
    assert_eq!(config.scan.request_timeout_secs, 15);
}

#[test]
fn test_from_file_full() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
root_folder = "/srv/inquisitor"

[logging]
level = "debug"

[google]
dev_key = "gkey"
cse_id = "cse"
page_limit = 3
page_budget = 50

[shodan]
api_key = "skey"
page_limit = 2

[scan]
workers = 8
asset_timeout_secs = 60
"#,
    );

    let config = TomlConfig::from_file(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/inquisitor")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.google.dev_key.as_deref(), Some("gkey"));
    assert_eq!(config.google.cse_id.as_deref(), Some("cse"));
    assert_eq!(config.google.page_limit, Some(3));
    assert_eq!(config.google.page_budget, Some(50));
    assert_eq!(config.shodan.api_key.as_deref(), Some("skey"));
    assert_eq!(config.shodan.page_limit, Some(2));
    assert!(config.shodan.page_budget.is_none());
    assert_eq!(config.scan.workers, 8);
    assert_eq!(config.scan.asset_timeout_secs, 60);
    // Unset keys inside a present section keep their defaults
    assert_eq!(config.scan.request_timeout_secs, 15);
}

#[test]
fn test_from_file_partial_sections() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[shodan]\napi_key = \"skey\"\n");

    let config = TomlConfig::from_file(&path).unwrap();
    assert_eq!(config.shodan.api_key.as_deref(), Some("skey"));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.scan.workers, 4);
}

#[test]
fn test_from_file_errors() {
    let dir = TempDir::new().unwrap();

    let missing = TomlConfig::from_file(&dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(Error::Config(_))));

    let path = write_config(&dir, "[scan\nworkers = ");
    let malformed = TomlConfig::from_file(&path);
    assert!(matches!(malformed, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_prefers_explicit_path_over_env() {
    let dir = TempDir::new().unwrap();
    let explicit = write_config(&dir, "[logging]\nlevel = \"warn\"\n");
    let env_path = dir.path().join("env.toml");
    std::fs::write(&env_path, "[logging]\nlevel = \"trace\"\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &env_path);
    let from_explicit = TomlConfig::load(Some(&explicit)).unwrap();
    let from_env = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(from_explicit.logging.level, "warn");
    assert_eq!(from_env.logging.level, "trace");
}

#[test]
#[serial]
fn test_load_missing_env_path_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.toml"));
    let result = TomlConfig::load(None);
    env::remove_var(CONFIG_ENV_VAR);

    let config = result.unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.scan.workers, 4);
    assert!(config.shodan.api_key.is_none());

    // An explicit path still has to exist
    assert!(matches!(
        TomlConfig::load(Some(&dir.path().join("absent.toml"))),
        Err(Error::Config(_))
    ));
}

#[test]
#[serial]
fn test_root_folder_priority() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    env::set_var(ROOT_FOLDER_ENV_VAR, "/from/env");
    assert_eq!(
        resolve_root_folder(Some(Path::new("/from/cli")), &config),
        PathBuf::from("/from/cli")
    );
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/env"));

    // Blank values are ignored
    env::set_var(ROOT_FOLDER_ENV_VAR, "  ");
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(!fallback.as_os_str().is_empty());
    assert!(fallback.to_string_lossy().contains("inquisitor"));
}

#[test]
#[serial]
fn test_database_path() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data")),
        ..TomlConfig::default()
    };

    assert_eq!(
        resolve_database_path(Some(Path::new("intel.db")), &config),
        PathBuf::from("intel.db")
    );
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/data").join(DATABASE_FILE_NAME)
    );
}

#[test]
fn test_is_valid_key() {
    assert!(is_valid_key("abc123"));
    assert!(is_valid_key("  padded  "));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("   \t"));
}
