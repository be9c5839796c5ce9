//! `glsync sync`: run one reconciliation pass.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use glsync_connector::traits::{DirectoryReader, TargetMutator, TargetReader};
use glsync_engine::SyncEngine;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::error::{CliError, CliResult};
use crate::logging::init_logging;
use crate::output::print_report;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Plan changes without writing to GitLab
    #[arg(long)]
    pub dry_run: bool,

    /// Remove members that left the directory group
    #[arg(long)]
    pub prune: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Flags override the file; they can only switch behaviors on.
pub fn apply_flags(config: &mut AppConfig, args: &SyncArgs) {
    if args.dry_run {
        config.sync.dry_run = true;
    }
    if args.prune {
        config.sync.prune = true;
    }
}

pub async fn execute(args: SyncArgs) -> CliResult<()> {
    let mut config = AppConfig::load(&args.config)?;
    apply_flags(&mut config, &args);
    init_logging(&config.log)?;

    let connectors = super::connect(&config)?;
    let directory: Arc<dyn DirectoryReader> = connectors.directory;
    let target: Arc<dyn TargetReader> = connectors.target.clone();
    let mutator: Arc<dyn TargetMutator> = connectors.target;

    let engine = SyncEngine::new(
        directory,
        target,
        mutator,
        config.ldap.layout.clone(),
        config.sync.clone(),
    );
    let report = engine.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.has_failures() {
        let s = &report.summary;
        return Err(CliError::CompletedWithFailures(
            s.groups_failed + s.users_failed + s.members_failed,
        ));
    }
    Ok(())
}
