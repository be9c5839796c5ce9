//! `glsync init`: write a starting configuration file.

use clap::Args;
use std::path::PathBuf;

use crate::config::{
    AppConfig, DEFAULT_CONFIG_PATH, ENV_GITLAB_PRIVATE_TOKEN, ENV_LDAP_BIND_PASSWORD,
};
use crate::error::CliResult;
use crate::output::{print_next_steps, print_success};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(args: InitArgs) -> CliResult<()> {
    AppConfig::write_template(&args.config, args.force)?;
    print_success(&format!("wrote {}", args.config.display()));
    print_next_steps(&[
        "Fill in the LDAP bases and the GitLab URL".to_string(),
        format!(
            "Put secrets in {} and {} instead of the file",
            ENV_LDAP_BIND_PASSWORD, ENV_GITLAB_PRIVATE_TOKEN
        ),
        format!("glsync check --config {}", args.config.display()),
    ]);
    Ok(())
}
