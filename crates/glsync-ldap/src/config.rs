//! LDAP connection configuration

use serde::{Deserialize, Serialize};
use glsync_connector::config::ConnectionSettings;
use glsync_connector::error::{ConnectorError, ConnectorResult};

/// Connection parameters for the LDAP directory.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Full LDAP URL (e.g. `ldaps://ldap.example.com:636`). Takes precedence
    /// over `host`/`port`/`use_ssl` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// LDAP server hostname or IP address.
    #[serde(default)]
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Verify the server certificate on TLS connections.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,

    /// Bind DN for authentication. Empty means anonymous bind.
    #[serde(default)]
    pub bind_dn: String,

    /// Bind password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("verify_certificate", &self.verify_certificate)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_true() -> bool {
    true
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self::new("localhost", "")
    }
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(host: impl Into<String>, bind_dn: impl Into<String>) -> Self {
        Self {
            url: None,
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            verify_certificate: true,
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection: ConnectionSettings::default(),
        }
    }

    /// Set bind password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set an explicit URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return url.to_string();
        }
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Host part used in log lines and the display name.
    #[must_use]
    pub fn display_host(&self) -> String {
        match self.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url
                .split("://")
                .nth(1)
                .unwrap_or(url)
                .trim_end_matches('/')
                .to_string(),
            None => self.host.clone(),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        match self.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => {
                if !(url.starts_with("ldap://") || url.starts_with("ldaps://")) {
                    return Err(ConnectorError::invalid_configuration(format!(
                        "ldap.url must start with ldap:// or ldaps://, got '{url}'"
                    )));
                }
            }
            None => {
                if self.host.is_empty() {
                    return Err(ConnectorError::invalid_configuration(
                        "ldap.host or ldap.url is required",
                    ));
                }
            }
        }

        if self.use_ssl && self.use_starttls {
            return Err(ConnectorError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }

        if !self.bind_dn.is_empty() && self.bind_password.is_none() {
            return Err(ConnectorError::invalid_configuration(
                "ldap.bind_password is required when ldap.bind_dn is set",
            ));
        }

        Ok(())
    }

    /// Copy of this config with secrets replaced.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some("***REDACTED***".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldap_config_url() {
        let config = LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com");
        assert_eq!(config.url(), "ldap://ldap.example.com:389");

        let ssl_config = config.with_ssl();
        assert_eq!(ssl_config.url(), "ldaps://ldap.example.com:636");
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = LdapConfig::new("ignored", "")
            .with_url("ldaps://dir.example.org:3269/");
        assert_eq!(config.url(), "ldaps://dir.example.org:3269/");
        assert_eq!(config.display_host(), "dir.example.org:3269");
    }

    #[test]
    fn test_ldap_config_validation() {
        let config = LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com")
            .with_password("secret");
        assert!(config.validate().is_ok());

        let anonymous = LdapConfig::new("ldap.example.com", "");
        assert!(anonymous.validate().is_ok());

        let empty_host = LdapConfig::new("", "");
        assert!(empty_host.validate().is_err());

        let no_password = LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com");
        assert!(no_password.validate().is_err());

        let both_tls = LdapConfig::new("ldap.example.com", "")
            .with_ssl()
            .with_starttls();
        assert!(both_tls.validate().is_err());

        let bad_url = LdapConfig::new("", "").with_url("http://ldap.example.com");
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com")
            .with_password("super-secret");

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(
            config.redacted().bind_password,
            Some("***REDACTED***".to_string())
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: LdapConfig = serde_json::from_str(
            r#"{"host": "ldap.example.com", "bind_dn": "cn=admin,dc=example,dc=com", "bind_password": "x"}"#,
        )
        .unwrap();

        assert_eq!(config.port, 389);
        assert!(config.verify_certificate);
        assert!(!config.use_ssl);
        assert_eq!(config.connection.connection_timeout_secs, 10);
    }
}
