//! Monitor node binary

use clap::Parser;
use meerkat::{Config, NodeServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "meerkat-node")]
#[command(about = "meerkat monitor node: liveness service and coordinator loop")]
#[command(version)]
struct Args {
    /// Config file (defaults to ./meerkat.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address for gRPC
    #[arg(long)]
    grpc: Option<String>,

    /// Host peers use to reach this node
    #[arg(long)]
    advertise_host: Option<String>,

    /// Status table service URL
    #[arg(long)]
    table_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load config from file, then override with CLI arguments
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(grpc) = args.grpc {
        config.node.grpc_addr = grpc.parse()?;
    }
    if let Some(host) = args.advertise_host {
        config.node.advertise_host = host;
    }
    if let Some(url) = args.table_url {
        config.node.table_url = url;
    }
    let log_level = args.log_level.unwrap_or_else(|| config.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    NodeServer::new(config.node).serve().await?;

    Ok(())
}
