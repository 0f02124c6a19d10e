//! Status table service binary

use clap::Parser;
use meerkat::table::{http, RocksTable, StatusTable};
use meerkat::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "meerkat-table")]
#[command(about = "meerkat shared status table (HTTP, RocksDB-backed)")]
#[command(version)]
struct Args {
    /// Config file (defaults to ./meerkat.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address for HTTP
    #[arg(long)]
    bind: Option<String>,

    /// Database directory
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.table.bind_addr = bind.parse()?;
    }
    if let Some(db) = args.db {
        config.table.db_path = db;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting status table");
    tracing::info!("  HTTP API: {}", config.table.bind_addr);
    tracing::info!("  DB path: {}", config.table.db_path.display());

    let table: Arc<dyn StatusTable> = Arc::new(RocksTable::open(&config.table.db_path)?);
    let listener = tokio::net::TcpListener::bind(config.table.bind_addr).await?;

    tracing::info!("✓ Status table ready");

    tokio::select! {
        res = http::serve(listener, table) => res?,
        _ = meerkat::node::server::shutdown_signal() => tracing::info!("shutting down"),
    }

    Ok(())
}
