//! Configuration file handling against real files.

use std::fs;

use glsync_cli::config::{AppConfig, ConfigError, LogFormat};
use glsync_cli::error::CliError;
use glsync_connector::types::{AccessLevel, Visibility};
use tempfile::TempDir;

const FULL: &str = r#"{
    "ldap": {
        "url": "ldaps://ldap.example.com:636",
        "bind_dn": "cn=sync,dc=example,dc=com",
        "bind_password": "ldap-secret",
        "groups_base_dn": "ou=groups,dc=example,dc=com",
        "users_base_dn": "ou=people,dc=example,dc=com",
        "group_name_filter": "eng-*",
        "user_filter": "(employeeType=staff)"
    },
    "gitlab": {
        "url": "https://gitlab.example.com",
        "private_token": "glpat-secret",
        "request_timeout_secs": 10,
        "max_read_retries": 5
    },
    "sync": {
        "create_users": true,
        "group_visibility": "internal",
        "access_level": "developer",
        "prune": true,
        "group_concurrency": 4
    },
    "log": {
        "level": "debug",
        "format": "json"
    }
}"#;

fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.json", FULL);

    let config = AppConfig::load(&path).unwrap();

    assert_eq!(config.ldap.connection.url(), "ldaps://ldap.example.com:636");
    assert_eq!(config.ldap.layout.group_name_filter, "eng-*");
    assert_eq!(
        config.ldap.layout.user_filter.as_deref(),
        Some("(employeeType=staff)")
    );
    assert!(config.sync.create_users);
    assert!(config.sync.prune);
    assert_eq!(config.sync.group_visibility, Visibility::Internal);
    assert_eq!(config.sync.access_level, AccessLevel::Developer);
    assert_eq!(config.sync.group_concurrency, 4);
    assert_eq!(config.gitlab.retry_config().max_retries, 5);
    assert_eq!(config.gitlab.request_timeout().as_secs(), 10);
    assert_eq!(config.log.format, LogFormat::Json);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let err = AppConfig::load(&dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, ConfigError::Read { .. }));
    assert_eq!(CliError::from(err).exit_code(), 1);
}

#[test]
fn test_malformed_json_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.json", "{ \"ldap\": ");

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_missing_users_base_is_rejected() {
    let dir = TempDir::new().unwrap();
    let body = FULL.replace(r#""users_base_dn": "ou=people,dc=example,dc=com","#, "");
    let path = write(&dir, "config.json", &body);

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. } | ConfigError::Parse { .. }));
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let dir = TempDir::new().unwrap();
    let body = FULL.replace(r#""group_concurrency": 4"#, r#""group_concurrency": 0"#);
    let path = write(&dir, "config.json", &body);

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "sync"));
}

#[test]
fn test_init_writes_loadable_template() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    AppConfig::write_template(&path, false).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    let config = AppConfig::parse(&raw, &path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.ldap.layout.users_base_dn, "ou=people,dc=example,dc=com");
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.json", FULL);

    let err = AppConfig::write_template(&path, false).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), FULL);

    AppConfig::write_template(&path, true).unwrap();
    assert_ne!(fs::read_to_string(&path).unwrap(), FULL);
}
