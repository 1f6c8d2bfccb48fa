//! Configuration loading from files and environment
//!
//! Uses serial_test: these tests mutate process-wide environment variables.

use admin_common::config::{
    resolve_config_path, AdminConfig, StoreConfig, CONFIG_ENV, DATABASE_URL_ENV,
    REST_API_KEY_ENV,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::Path;

fn clear_env() {
    env::remove_var(CONFIG_ENV);
    env::remove_var(REST_API_KEY_ENV);
    env::remove_var(DATABASE_URL_ENV);
}

fn write_config(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = AdminConfig::load(Some(&missing)).unwrap();
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.store.backend_name(), "sql");
}

#[test]
#[serial]
fn test_cli_path_beats_environment_path() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let cli = write_config(dir.path(), "[server]\nport = 9100\n");
    env::set_var(CONFIG_ENV, "/definitely/not/here.toml");

    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));
    let config = AdminConfig::load(Some(&cli)).unwrap();
    assert_eq!(config.server.port, 9100);

    assert_eq!(
        resolve_config_path(None),
        Some("/definitely/not/here.toml".into())
    );
    clear_env();
}

#[test]
#[serial]
fn test_api_key_from_environment_overrides_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[store]
backend = "rest"
base_url = "https://project.example.co"
api_key = "from-file"
"#,
    );
    env::set_var(REST_API_KEY_ENV, "from-env");

    let config = AdminConfig::load(Some(&path)).unwrap();
    match config.store {
        StoreConfig::Rest { api_key, .. } => assert_eq!(api_key.as_deref(), Some("from-env")),
        other => panic!("unexpected store config: {:?}", other),
    }
    clear_env();
}

#[test]
#[serial]
fn test_rest_backend_without_any_key_fails_to_load() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[store]\nbackend = \"rest\"\nbase_url = \"https://project.example.co\"\n",
    );
    assert!(AdminConfig::load(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_database_url_from_environment() {
    clear_env();
    env::set_var(DATABASE_URL_ENV, "sqlite::memory:");
    let dir = tempfile::tempdir().unwrap();
    let config = AdminConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(
        config.store,
        StoreConfig::Sql {
            database_url: "sqlite::memory:".into(),
            max_connections: 5,
        }
    );
    clear_env();
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[server\nport = ");
    assert!(AdminConfig::load(Some(&path)).is_err());
}
