//! # LDAP Directory
//!
//! Read-only LDAP access for glsync: connection setup, bind, and searches
//! returning raw entries for the reconciliation engine to normalize.
//!
//! ## Example
//!
//! ```ignore
//! use glsync_ldap::{LdapConfig, LdapDirectory};
//! use glsync_connector::prelude::*;
//!
//! let config = LdapConfig::new("ldap.example.com", "cn=admin,dc=example,dc=com")
//!     .with_password("secret")
//!     .with_ssl();
//!
//! let directory = LdapDirectory::new(config)?;
//! directory.test_connection().await?;
//! let groups = directory
//!     .search("ou=groups,dc=example,dc=com", &Filter::present("cn"), SearchScope::Subtree)
//!     .await?;
//! ```

pub mod config;
pub mod connector;

// Re-exports
pub use config::LdapConfig;
pub use connector::LdapDirectory;
