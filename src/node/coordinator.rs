//! Coordinator loop
//!
//! Runs forever on every node:
//!
//! 1. Wait on the heartbeat timer; a reset during the wait voids the round
//! 2. Announce this node as coordinator (best effort, last writer wins)
//! 3. Read the status table, keep registered rows other than our own
//! 4. Read the head of the command queue
//! 5. Poll every peer concurrently, apply the failure ladder, write back
//!    (and hand `ALL` commands to reachable peers); run `MOMKAT` locally
//! 6. Join every task, then pop the command
//!
//! Two nodes may elect themselves in the same window. Both then poll the
//! same peers and overwrite the same rows with equivalent values.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::common::{current_time, peer_addr, MonitorConfig, Result};
use crate::node::client::PeerTransport;
use crate::node::command::CommandType;
use crate::node::context::NodeContext;
use crate::node::ladder::NodeStatusRow;
use crate::node::queue::{CommandQueue, QueuedCommand};
use crate::node::registry::StatusRegistry;
use crate::node::timer::TimerOutcome;

/// What one round did
#[derive(Debug, Default, Clone)]
pub struct RoundReport {
    pub polled: usize,
    pub reachable: usize,
    pub write_failures: usize,
    /// ServerIDs whose rows were retired this round
    pub retired: Vec<String>,
    /// CMDID of the command handled this round
    pub command: Option<String>,
}

/// Result of one peer task
#[derive(Debug)]
enum TaskOutcome {
    Peer {
        row: NodeStatusRow,
        reachable: bool,
        written: bool,
    },
    Local,
}

pub struct Coordinator {
    ctx: Arc<NodeContext>,
    registry: StatusRegistry,
    queue: CommandQueue,
    transport: Arc<dyn PeerTransport>,
    config: MonitorConfig,
    /// This node's own status row, for local command results
    own_row: Option<u32>,
}

impl Coordinator {
    pub fn new(
        ctx: Arc<NodeContext>,
        registry: StatusRegistry,
        queue: CommandQueue,
        transport: Arc<dyn PeerTransport>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            ctx,
            registry,
            queue,
            transport,
            config,
            own_row: None,
        }
    }

    pub fn with_own_row(mut self, row: u32) -> Self {
        self.own_row = Some(row);
        self
    }

    /// Loop until `shutdown` turns true. A running round always completes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                outcome = self.ctx.timer().start() => {
                    if outcome == TimerOutcome::Reset {
                        tracing::debug!("polled during wait, another node coordinates");
                        continue;
                    }
                    match self.run_round().await {
                        Ok(report) => tracing::debug!(?report, "coordinator round complete"),
                        Err(e) => tracing::error!("coordinator round aborted: {}", e),
                    }
                }
                stopped = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => {
                    if !stopped {
                        tracing::warn!("shutdown channel closed");
                    }
                    break;
                }
            }
        }
        tracing::info!("coordinator loop stopped");
    }

    /// Run one elected round.
    ///
    /// Only a failed peer discovery aborts the round; every other failure is
    /// logged and isolated.
    pub async fn run_round(&self) -> Result<RoundReport> {
        self.ctx.set_coordinating(true);
        let result = self.round().await;
        self.ctx.set_coordinating(false);
        result
    }

    async fn round(&self) -> Result<RoundReport> {
        let me = self.ctx.server_id().to_string();

        if let Err(e) = self.registry.announce(&me).await {
            tracing::warn!("could not write coordinator announcement: {}", e);
        }

        let peers = self.registry.discover_peers(&me).await?;

        let cmd = match self.queue.head().await {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!("could not read command queue: {}", e);
                None
            }
        };
        let cmd_type = cmd.as_ref().and_then(|c| match c.command_type() {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(cmd_id = %c.cmd_id, "dropping queued command: {}", e);
                None
            }
        });

        let mut report = RoundReport {
            polled: peers.len(),
            command: cmd.as_ref().map(|c| c.cmd_id.clone()),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();

        if let (Some(c), Some(CommandType::MomKat)) = (&cmd, cmd_type) {
            let ctx = self.ctx.clone();
            let queue = self.queue.clone();
            let own_row = self.own_row;
            let c = c.clone();
            tasks.spawn(async move {
                run_local_command(&ctx, &queue, own_row, &c).await;
                TaskOutcome::Local
            });
        }

        let broadcast = match (&cmd, cmd_type) {
            (Some(c), Some(CommandType::All)) => Some(c.clone()),
            _ => None,
        };

        for peer in peers {
            let registry = self.registry.clone();
            let queue = self.queue.clone();
            let transport = self.transport.clone();
            let broadcast = broadcast.clone();
            let trans_count = self.config.trans_count;
            let timeout = self.config.call_timeout();

            tasks.spawn(async move {
                let addr = peer_addr(&peer.server_id).to_string();
                let reachable =
                    match tokio::time::timeout(timeout, transport.get_child_status(&addr)).await {
                        Ok(Ok(_)) => true,
                        Ok(Err(e)) if e.is_transport() => {
                            tracing::info!("{}: could not fetch status information: {}", addr, e);
                            false
                        }
                        Ok(Err(e)) => {
                            tracing::error!("{}: status poll failed: {}", addr, e);
                            false
                        }
                        Err(_) => {
                            tracing::info!("{}: status poll timed out after {:?}", addr, timeout);
                            false
                        }
                    };

                let row = peer.apply_poll(reachable, trans_count, current_time());
                tracing::info!("[{}] {}-{}", row.server_id, row.status, row.time);

                let written = match registry.write_status(&row).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(row = row.row_number, "could not write status: {}", e);
                        false
                    }
                };

                if let Some(c) = broadcast {
                    if reachable && row.check_bit {
                        dispatch_command(transport.as_ref(), &queue, &row, &addr, &c, timeout)
                            .await;
                    }
                }

                TaskOutcome::Peer {
                    row,
                    reachable,
                    written,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Peer {
                    row,
                    reachable,
                    written,
                }) => {
                    if reachable {
                        report.reachable += 1;
                    }
                    if !written {
                        report.write_failures += 1;
                    }
                    if !row.check_bit {
                        tracing::warn!("[{}] retired after repeated failures", row.server_id);
                        report.retired.push(row.server_id);
                    }
                }
                Ok(TaskOutcome::Local) => {}
                Err(e) => tracing::error!("poll task failed: {}", e),
            }
        }

        if cmd.is_some() {
            if let Err(e) = self.queue.pop().await {
                tracing::error!("could not pop command queue: {}", e);
            }
        }

        tracing::info!(
            polled = report.polled,
            reachable = report.reachable,
            "coordinator round finished by {}",
            me
        );
        Ok(report)
    }
}

async fn run_local_command(
    ctx: &NodeContext,
    queue: &CommandQueue,
    own_row: Option<u32>,
    cmd: &QueuedCommand,
) {
    let result = match ctx.run_local(CommandType::MomKat, &cmd.cmd) {
        Ok(out) => out,
        Err(e) => e.to_string(),
    };
    let time = current_time();
    tracing::info!("[{}] {}-{}-{}", ctx.server_id(), cmd.cmd, result, time);

    if let Some(row) = own_row {
        if let Err(e) = queue
            .write_result(row, &cmd.cmd_id, ctx.server_id(), &result, &time)
            .await
        {
            tracing::error!(row, "could not write command result: {}", e);
        }
    }
}

async fn dispatch_command(
    transport: &dyn PeerTransport,
    queue: &CommandQueue,
    peer: &NodeStatusRow,
    addr: &str,
    cmd: &QueuedCommand,
    timeout: std::time::Duration,
) {
    let call = transport.run_command(addr, cmd.to_proto());
    let result = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(res)) => res.result,
        Ok(Err(e)) => {
            tracing::info!("{}: could not run command {}: {}", addr, cmd.cmd_id, e);
            format!("error: {}", e)
        }
        Err(_) => {
            tracing::info!("{}: command {} timed out", addr, cmd.cmd_id);
            format!("error: timed out after {:?}", timeout)
        }
    };
    let time = current_time();
    tracing::info!("[{}] {}-{}-{}", peer.server_id, cmd.cmd, result, time);

    if let Err(e) = queue
        .write_result(peer.row_number, &cmd.cmd_id, &peer.server_id, &result, &time)
        .await
    {
        tracing::error!(row = peer.row_number, "could not write command result: {}", e);
    }
}
