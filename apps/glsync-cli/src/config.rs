//! Configuration file loading
//!
//! One JSON document with `ldap`, `gitlab`, `sync` and `log` sections.
//! Secrets may be left out of the file and supplied through the environment
//! (a `.env` file is honored).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use glsync_connector::resilience::RetryConfig;
use glsync_engine::{DirectoryLayout, SyncSettings};
use glsync_gitlab::GitLabAuth;
use glsync_ldap::LdapConfig;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const ENV_LDAP_BIND_PASSWORD: &str = "GLSYNC_LDAP_BIND_PASSWORD";
pub const ENV_GITLAB_PRIVATE_TOKEN: &str = "GLSYNC_GITLAB_PRIVATE_TOKEN";
pub const ENV_GITLAB_OAUTH_TOKEN: &str = "GLSYNC_GITLAB_OAUTH_TOKEN";

/// Errors raised while loading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field}: {message}")]
    Invalid { field: String, message: String },

    #[error("{0} already exists (pass --force to overwrite)")]
    AlreadyExists(PathBuf),
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Directory connection plus where groups and users live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapSection {
    #[serde(flatten)]
    pub connection: LdapConfig,
    #[serde(flatten)]
    pub layout: DirectoryLayout,
}

/// GitLab instance and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct GitLabSection {
    /// Instance root, e.g. `https://gitlab.example.com`.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,

    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries for idempotent reads on transient errors.
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,
}

impl fmt::Debug for GitLabSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "***REDACTED***");
        f.debug_struct("GitLabSection")
            .field("url", &self.url)
            .field("private_token", &redact(&self.private_token))
            .field("oauth_token", &redact(&self.oauth_token))
            .field("ssl_verify", &self.ssl_verify)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_read_retries", &self.max_read_retries)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_read_retries() -> u32 {
    3
}

impl GitLabSection {
    /// The configured credential. Exactly one token kind must be set.
    pub fn auth(&self) -> Result<GitLabAuth, ConfigError> {
        let private = self.private_token.as_deref().filter(|t| !t.is_empty());
        let oauth = self.oauth_token.as_deref().filter(|t| !t.is_empty());
        match (private, oauth) {
            (Some(token), None) => Ok(GitLabAuth::PrivateToken(token.to_string())),
            (None, Some(token)) => Ok(GitLabAuth::OAuthToken(token.to_string())),
            (Some(_), Some(_)) => Err(ConfigError::invalid(
                "gitlab",
                "set either private_token or oauth_token, not both",
            )),
            (None, None) => Err(ConfigError::invalid(
                "gitlab",
                format!("a token is required (private_token, oauth_token or {ENV_GITLAB_PRIVATE_TOKEN})"),
            )),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_read_retries,
            ..RetryConfig::default()
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub ldap: LdapSection,
    pub gitlab: GitLabSection,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl AppConfig {
    /// Read, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&raw, path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse without overrides or validation.
    pub fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill secrets from `lookup` (normally the process environment).
    ///
    /// A token from the environment replaces both token fields of the file,
    /// so switching auth modes never leaves two tokens configured.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(password) = lookup(ENV_LDAP_BIND_PASSWORD) {
            self.ldap.connection.bind_password = Some(password);
        }
        if let Some(token) = lookup(ENV_GITLAB_PRIVATE_TOKEN) {
            self.gitlab.private_token = Some(token);
            self.gitlab.oauth_token = None;
        } else if let Some(token) = lookup(ENV_GITLAB_OAUTH_TOKEN) {
            self.gitlab.oauth_token = Some(token);
            self.gitlab.private_token = None;
        }
    }

    /// Fail fast on anything the run could not work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ldap
            .connection
            .validate()
            .map_err(|e| ConfigError::invalid("ldap", e.to_string()))?;
        self.ldap
            .layout
            .validate()
            .map_err(|e| ConfigError::invalid("ldap", e.to_string()))?;

        let url = self.gitlab.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "gitlab.url",
                format!("must start with http:// or https://, got '{url}'"),
            ));
        }
        self.gitlab.auth()?;
        if self.gitlab.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "gitlab.request_timeout_secs",
                "must be at least 1",
            ));
        }

        self.sync
            .validate()
            .map_err(|e| ConfigError::invalid("sync", e.to_string()))?;
        Ok(())
    }

    /// Starting point written by `glsync init`.
    pub fn template() -> Self {
        Self {
            ldap: LdapSection {
                connection: LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com")
                    .with_password("change-me"),
                layout: DirectoryLayout::new(
                    "ou=groups,dc=example,dc=com",
                    "ou=people,dc=example,dc=com",
                ),
            },
            gitlab: GitLabSection {
                url: "https://gitlab.example.com".to_string(),
                private_token: Some("change-me".to_string()),
                oauth_token: None,
                ssl_verify: true,
                request_timeout_secs: default_request_timeout(),
                max_read_retries: default_max_read_retries(),
            },
            sync: SyncSettings::default(),
            log: LogSettings::default(),
        }
    }

    /// Write the template to `path`, refusing to replace a file unless `force`.
    pub fn write_template(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let body = serde_json::to_string_pretty(&Self::template()).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, body + "\n").map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"{
        "ldap": {
            "host": "ldap.example.com",
            "bind_dn": "cn=admin,dc=example,dc=com",
            "bind_password": "secret",
            "groups_base_dn": "ou=groups,dc=example,dc=com",
            "users_base_dn": "ou=people,dc=example,dc=com"
        },
        "gitlab": {
            "url": "https://gitlab.example.com",
            "private_token": "glpat-file"
        }
    }"#;

    fn minimal() -> AppConfig {
        AppConfig::parse(MINIMAL, Path::new("config.json")).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = minimal();
        assert!(config.validate().is_ok());
        assert_eq!(config.ldap.connection.port, 389);
        assert_eq!(config.ldap.layout.group_name_filter, "*");
        assert_eq!(config.ldap.layout.username_attributes, vec!["uid", "sAMAccountName"]);
        assert_eq!(config.sync.ldap_provider, "ldapmain");
        assert!(!config.sync.create_users);
        assert!(config.gitlab.ssl_verify);
        assert_eq!(config.gitlab.request_timeout_secs, 30);
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = minimal();
        let env: HashMap<&str, &str> = [
            (ENV_LDAP_BIND_PASSWORD, "from-env"),
            (ENV_GITLAB_OAUTH_TOKEN, "oauth-env"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ldap.connection.bind_password.as_deref(), Some("from-env"));
        assert!(config.gitlab.private_token.is_none());
        assert!(matches!(
            config.gitlab.auth().unwrap(),
            GitLabAuth::OAuthToken(t) if t == "oauth-env"
        ));
    }

    #[test]
    fn test_exactly_one_token_required() {
        let mut config = minimal();
        config.gitlab.oauth_token = Some("also".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "gitlab"
        ));

        config.gitlab.private_token = None;
        config.gitlab.oauth_token = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_gitlab_url() {
        let mut config = minimal();
        config.gitlab.url = "gitlab.example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "gitlab.url"
        ));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = minimal();
        let debug = format!("{config:?}");
        assert!(!debug.contains("glpat-file"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_template_is_valid() {
        assert!(AppConfig::template().validate().is_ok());
    }
}
