//! CLI for fleet inspection and command queueing

use std::sync::Arc;

use clap::{Parser, Subcommand};
use meerkat::node::{CommandQueue, CommandType, GrpcPeerClient, PeerTransport, StatusRegistry};
use meerkat::proto;
use meerkat::table::HttpTable;
use meerkat::Config;

#[derive(Parser)]
#[command(name = "meerkat")]
#[command(about = "meerkat fleet monitor CLI")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./meerkat.toml when present)
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Status table URL (overrides the config file)
    #[arg(long)]
    table_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show registered nodes and the last coordinator
    Status,

    /// List queued commands
    Queue,

    /// Queue a command for the next coordinator round
    Enqueue {
        /// ALL (every peer) or MOMKAT (coordinator only)
        #[arg(long = "type", default_value = "ALL")]
        cmd_type: String,

        /// Command text, e.g. '$whoareu'
        cmd: String,
    },

    /// Poll one node directly
    Ping {
        /// Node address (host:port)
        addr: String,
    },

    /// Run a command on one node directly
    Exec {
        /// Node address (host:port)
        addr: String,

        #[arg(long = "type", default_value = "ALL")]
        cmd_type: String,

        /// Command text
        cmd: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let monitor = config.node.monitor;
    let table_url = cli.table_url.unwrap_or(config.node.table_url);

    match cli.command {
        Commands::Status => {
            let table = Arc::new(HttpTable::new(table_url)?);
            let registry = StatusRegistry::new(table, monitor);
            let rows = registry.active_rows().await?;
            let coordinator = registry.coordinator().await?;

            println!("Fleet status:");
            println!("  Coordinator: {}", coordinator.as_deref().unwrap_or("-"));
            println!("  Registered: {}", rows.len());
            for row in rows {
                println!(
                    "  row {:>3}  {}  {} (x{})  {}",
                    row.row_number, row.status, row.server_id, row.count, row.time
                );
            }
        }

        Commands::Queue => {
            let table = Arc::new(HttpTable::new(table_url)?);
            let queue = CommandQueue::new(table, monitor);
            let commands = queue.list().await?;
            println!("Queued commands: {}", commands.len());
            for c in commands {
                println!("  {}  {:<6}  {}", c.cmd_id, c.cmd_type, c.cmd);
            }
        }

        Commands::Enqueue { cmd_type, cmd } => {
            let cmd_type: CommandType = cmd_type.parse()?;
            let table = Arc::new(HttpTable::new(table_url)?);
            let queue = CommandQueue::new(table, monitor);
            let queued = queue.enqueue(cmd_type, &cmd).await?;
            println!("✓ Queued {} ({})", queued.cmd_id, queued.cmd_type);
        }

        Commands::Ping { addr } => {
            let client = GrpcPeerClient::new(monitor.call_timeout());
            let status = client.get_child_status(&addr).await?;
            println!("[{}] {}-{}", status.server_id, status.status, status.time);
        }

        Commands::Exec {
            addr,
            cmd_type,
            cmd,
        } => {
            let cmd_type: CommandType = cmd_type.parse()?;
            let client = GrpcPeerClient::new(monitor.call_timeout());
            let request = proto::Command {
                cmdid: uuid::Uuid::new_v4().to_string(),
                cmdtype: cmd_type.to_string(),
                cmd,
            };
            let res = client.run_command(&addr, request).await?;
            println!("[{}] {}-{}-{}", res.server_id, res.cmd, res.result, res.time);
        }
    }

    Ok(())
}
