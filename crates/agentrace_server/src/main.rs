//! AGENTRACE Server
//!
//! Serves checkpoint and replay endpoints over a redb or in-memory store.

#![warn(missing_docs)]
#![warn(clippy::all)]

use agentrace_replay::{EngineConfig, ExecutorRegistry, ReplayService};
use agentrace_server::ApiServer;
use agentrace_store::{MemoryStore, RedbStore, StateStore};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "agentrace-server")]
#[command(about = "AGENTRACE checkpoint and replay server", long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "AGENTRACE_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// redb database file; state is kept in memory when omitted
    #[arg(long, env = "AGENTRACE_DB")]
    db: Option<PathBuf>,

    /// Replay deadline for requests that do not set one
    #[arg(long, env = "AGENTRACE_DEFAULT_TIMEOUT", default_value_t = 300)]
    default_timeout: u64,

    /// Log output format
    #[arg(long, env = "AGENTRACE_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agentrace=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let store: Arc<dyn StateStore> = match &args.db {
        Some(path) => {
            tracing::info!(path = %path.display(), "opening redb store");
            Arc::new(RedbStore::open(path)?)
        }
        None => {
            tracing::warn!("no --db given; checkpoints and replays are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let config = EngineConfig::default().with_default_timeout(args.default_timeout);
    let service = ReplayService::new(store, ExecutorRegistry::with_defaults(), config);

    let server = ApiServer::new(&args.bind, service)?;
    server.serve().await?;

    Ok(())
}
