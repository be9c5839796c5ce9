//! LDAP directory reader
//!
//! Implements [`DirectoryReader`] over an async `ldap3` connection.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use glsync_connector::error::{ConnectorError, ConnectorResult};
use glsync_connector::operation::{Filter, RawEntry, SearchScope};
use glsync_connector::traits::{Connector, DirectoryReader};

use crate::config::LdapConfig;

/// LDAP result codes we react to.
const RC_SUCCESS: u32 = 0;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_INSUFFICIENT_ACCESS: u32 = 50;
const RC_BUSY: u32 = 51;
const RC_UNAVAILABLE: u32 = 52;

/// Read-only LDAP directory connection.
pub struct LdapDirectory {
    /// Configuration.
    config: LdapConfig,

    /// Display name for this connector instance.
    display_name: String,

    /// Cached LDAP connection (lazily initialized, dropped on transport errors).
    connection: Arc<RwLock<Option<Ldap>>>,
}

impl LdapDirectory {
    /// Create a new directory reader with the given configuration.
    pub fn new(config: LdapConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("LDAP: {}", config.display_host());

        Ok(Self {
            config,
            display_name,
            connection: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> ConnectorResult<Ldap> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;
        // Another task may have connected while we waited for the lock.
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let conn = self.create_connection().await?;
        *conn_guard = Some(conn.clone());
        Ok(conn)
    }

    /// Forget the cached connection so the next call reconnects.
    async fn invalidate_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        if conn_guard.take().is_some() {
            debug!("Dropped cached LDAP connection");
        }
    }

    /// Create a new LDAP connection and bind.
    async fn create_connection(&self) -> ConnectorResult<Ldap> {
        let url = self.config.url();

        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout())
            .set_starttls(self.config.use_starttls)
            .set_no_tls_verify(!self.config.verify_certificate);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .with_timeout(self.config.connection.operation_timeout())
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc != RC_SUCCESS {
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(ConnectorError::AuthenticationFailed);
            }
            return Err(ConnectorError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.display_host(), "LDAP connection established");

        Ok(ldap)
    }

    /// Convert our Filter to LDAP filter string.
    pub(crate) fn filter_to_ldap(filter: &Filter) -> String {
        match filter {
            Filter::And { filters } => {
                let inner: Vec<String> = filters.iter().map(Self::filter_to_ldap).collect();
                format!("(&{})", inner.join(""))
            }
            Filter::Or { filters } => {
                let inner: Vec<String> = filters.iter().map(Self::filter_to_ldap).collect();
                format!("(|{})", inner.join(""))
            }
            Filter::Not { filter } => {
                format!("(!{})", Self::filter_to_ldap(filter))
            }
            Filter::Equals { attribute, value } => {
                format!("({}={})", attribute, Self::escape_ldap_value(value))
            }
            Filter::Matches { attribute, pattern } => {
                let escaped: Vec<String> = pattern
                    .split('*')
                    .map(Self::escape_ldap_value)
                    .collect();
                format!("({}={})", attribute, escaped.join("*"))
            }
            Filter::Present { attribute } => {
                format!("({attribute}=*)")
            }
            Filter::Raw { expression } => {
                let trimmed = expression.trim();
                if trimmed.starts_with('(') && trimmed.ends_with(')') {
                    trimmed.to_string()
                } else {
                    format!("({trimmed})")
                }
            }
        }
    }

    /// Escape special characters in LDAP filter values (RFC 4515).
    pub(crate) fn escape_ldap_value(value: &str) -> String {
        value
            .replace('\\', "\\5c")
            .replace('*', "\\2a")
            .replace('(', "\\28")
            .replace(')', "\\29")
            .replace('\0', "\\00")
    }

    fn ldap_scope(scope: SearchScope) -> Scope {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }

    /// Convert LDAP search entry to a raw entry. Binary attributes are dropped.
    fn entry_to_raw(entry: SearchEntry) -> RawEntry {
        let attributes: HashMap<String, Vec<String>> = entry
            .attrs
            .into_iter()
            .filter(|(_, values)| !values.is_empty())
            .collect();
        RawEntry {
            dn: entry.dn,
            attributes,
        }
    }

    /// Map a transport-level error, dropping the cached connection.
    async fn transport_error(&self, context: &str, e: LdapError) -> ConnectorError {
        self.invalidate_connection().await;
        ConnectorError::network_with_source(format!("{context}: {e}"), e)
    }

    fn result_code_error(base: &str, rc: u32, text: &str) -> ConnectorError {
        match rc {
            RC_INVALID_CREDENTIALS => ConnectorError::AuthenticationFailed,
            RC_INSUFFICIENT_ACCESS => ConnectorError::AuthorizationFailed {
                operation: format!("search under {base}"),
            },
            RC_BUSY | RC_UNAVAILABLE => ConnectorError::TargetUnavailable {
                message: format!("LDAP server returned code {rc}: {text}"),
            },
            _ => ConnectorError::operation_failed(format!(
                "LDAP search under {base} failed with code {rc}: {text}"
            )),
        }
    }
}

#[async_trait]
impl Connector for LdapDirectory {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let mut ldap = self.get_connection().await?;

        // Root DSE is readable on every server once bound.
        let result = ldap
            .with_timeout(self.config.connection.operation_timeout())
            .search("", Scope::Base, "(objectClass=*)", vec!["namingContexts"])
            .await;
        let result = match result {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("Test search failed", e).await),
        };

        let (entries, _res) = result.success().map_err(|e| {
            ConnectorError::connection_failed(format!("Test search failed: {e}"))
        })?;

        if entries.is_empty() {
            return Err(ConnectorError::connection_failed(
                "Root DSE not readable with the configured bind",
            ));
        }

        info!("LDAP connection test successful");
        Ok(())
    }
}

#[async_trait]
impl DirectoryReader for LdapDirectory {
    #[instrument(skip(self, filter))]
    async fn search(
        &self,
        base: &str,
        filter: &Filter,
        scope: SearchScope,
    ) -> ConnectorResult<Vec<RawEntry>> {
        let mut ldap = self.get_connection().await?;
        let ldap_filter = Self::filter_to_ldap(filter);

        debug!(base_dn = %base, filter = %ldap_filter, ?scope, "Searching LDAP");

        let result = ldap
            .with_timeout(self.config.connection.operation_timeout())
            .search(base, Self::ldap_scope(scope), &ldap_filter, vec!["*"])
            .await;
        let ldap3::SearchResult(entries, res) = match result {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("LDAP search failed", e).await),
        };

        match res.rc {
            RC_SUCCESS => {}
            RC_NO_SUCH_OBJECT => {
                debug!(base_dn = %base, "Search base does not exist");
                return Ok(Vec::new());
            }
            rc => return Err(Self::result_code_error(base, rc, &res.text)),
        }

        let entries: Vec<RawEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(Self::entry_to_raw)
            .collect();

        debug!(returned = entries.len(), "LDAP search completed");

        Ok(entries)
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("display_name", &self.display_name)
            .field("config", &self.config.redacted())
            .finish()
    }
}
