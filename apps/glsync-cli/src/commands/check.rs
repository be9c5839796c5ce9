//! `glsync check`: verify both connections without changing anything.

use clap::Args;
use std::path::PathBuf;

use glsync_connector::resilience::CallTimeout;
use glsync_connector::traits::Connector;
use glsync_engine::directory::DirectoryModel;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::error::CliResult;
use crate::logging::init_logging;
use crate::output::{print_key_value, print_next_steps, print_success};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

pub async fn execute(args: CheckArgs) -> CliResult<()> {
    let config = AppConfig::load(&args.config)?;
    init_logging(&config.log)?;
    print_success(&format!("configuration {} is valid", args.config.display()));

    let connectors = super::connect(&config)?;
    let timeout = CallTimeout::new(config.sync.call_timeout());

    timeout
        .run("ldap bind", connectors.directory.test_connection())
        .await?;
    print_success(&format!("bound to {}", connectors.directory.display_name()));

    let model = DirectoryModel::new(connectors.directory.as_ref(), &config.ldap.layout, timeout);
    let groups = model.list_group_entries().await?;
    print_key_value(
        "groups matched",
        &format!("{} under {}", groups.len(), config.ldap.layout.groups_base_dn),
    );

    let username = connectors.target.whoami().await?;
    print_success(&format!("authenticated to {}", connectors.target.display_name()));
    print_key_value("token owner", &username);

    print_next_steps(&[
        format!("glsync sync --config {} --dry-run", args.config.display()),
        format!("glsync sync --config {}", args.config.display()),
    ]);
    Ok(())
}
