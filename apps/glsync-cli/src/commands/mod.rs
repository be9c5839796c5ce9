//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod sync;

use std::sync::Arc;

use glsync_gitlab::{GitLabClient, GitLabTarget};
use glsync_ldap::LdapDirectory;

use crate::config::AppConfig;
use crate::error::CliResult;

/// Directory and target connectors built from the configuration.
pub(crate) struct Connectors {
    pub directory: Arc<LdapDirectory>,
    pub target: Arc<GitLabTarget>,
}

pub(crate) fn connect(config: &AppConfig) -> CliResult<Connectors> {
    let directory = LdapDirectory::new(config.ldap.connection.clone())?;

    let client = GitLabClient::new(
        &config.gitlab.url,
        config.gitlab.auth()?,
        config.gitlab.request_timeout(),
        config.gitlab.ssl_verify,
    )?;
    let target = GitLabTarget::with_retry(client, config.gitlab.retry_config());

    Ok(Connectors {
        directory: Arc::new(directory),
        target: Arc::new(target),
    })
}
