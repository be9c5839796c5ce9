//! glsync - keep GitLab group membership in line with LDAP groups

use clap::{Parser, Subcommand};

use glsync_cli::commands;
use glsync_cli::error::CliResult;

/// glsync - LDAP to GitLab group synchronization
#[derive(Parser)]
#[command(name = "glsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile GitLab groups with the directory
    Sync(commands::sync::SyncArgs),

    /// Test the LDAP and GitLab connections
    Check(commands::check::CheckArgs),

    /// Write a starting configuration file
    Init(commands::init::InitArgs),
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
        Commands::Check(args) => commands::check::execute(args).await,
        Commands::Init(args) => commands::init::execute(args).await,
    }
}
