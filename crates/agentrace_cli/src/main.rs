//! AGENTRACE CLI
//!
//! Import traces, checkpoint them and replay from the command line.

#![warn(clippy::all)]

mod commands;
mod import;

use agentrace_replay::{EngineConfig, ExecutorRegistry, ReplayService};
use agentrace_store::{RedbStore, StateStore};
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use commands::Command;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentrace")]
#[command(about = "AGENTRACE - checkpoint and replay multi-agent traces", long_about = None)]
struct Cli {
    /// redb database file
    #[arg(long, global = true, env = "AGENTRACE_DB", default_value = "agentrace.redb")]
    db: PathBuf,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "agentrace=debug" } else { "agentrace=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(path = %cli.db.display(), "opening redb store");
    let store = Arc::new(
        RedbStore::open(&cli.db).wrap_err_with(|| format!("opening {}", cli.db.display()))?,
    );
    let service = ReplayService::new(
        store.clone() as Arc<dyn StateStore>,
        ExecutorRegistry::with_defaults(),
        EngineConfig::default(),
    );

    let output = cli.command.run(&service, store.as_ref()).await?;
    print!("{output}");
    Ok(())
}
