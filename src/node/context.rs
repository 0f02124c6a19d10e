//! Per-process node state shared by the RPC service and the coordinator loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::command::{self, CommandType};
use super::timer::HeartbeatTimer;
use crate::common::{Error, Result};

/// Deferred, non-cancellable process stop
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    grace: Duration,
}

impl Shutdown {
    pub fn new(grace: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            grace,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Stop now
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Stop after the grace delay, from a background task
    pub fn schedule(&self) {
        let tx = self.tx.clone();
        let grace = self.grace;
        tracing::warn!("termination requested, stopping in {:?}", grace);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            tx.send_replace(true);
        });
    }
}

pub struct NodeContext {
    server_id: String,
    timer: HeartbeatTimer,
    shutdown: Shutdown,
    coordinating: AtomicBool,
}

impl NodeContext {
    pub fn new(server_id: impl Into<String>, timer_period: Duration, kill_grace: Duration) -> Self {
        Self {
            server_id: server_id.into(),
            timer: HeartbeatTimer::new(timer_period),
            shutdown: Shutdown::new(kill_grace),
            coordinating: AtomicBool::new(false),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn timer(&self) -> &HeartbeatTimer {
        &self.timer
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Is a coordinator round running on this node right now?
    pub fn is_coordinating(&self) -> bool {
        self.coordinating.load(Ordering::SeqCst)
    }

    pub fn set_coordinating(&self, on: bool) {
        self.coordinating.store(on, Ordering::SeqCst);
    }

    /// Execute a command received from a peer.
    ///
    /// Coordinator-only commands are refused unless a round is running here.
    pub fn run_remote(&self, cmd_type: CommandType, cmd: &str) -> Result<String> {
        if cmd_type == CommandType::MomKat && !self.is_coordinating() {
            return Err(Error::CommandRejected(format!(
                "[{}] not acting as coordinator, refusing {} command",
                self.server_id,
                command::MOMKAT
            )));
        }
        Ok(command::execute(cmd, &self.server_id, &self.shutdown))
    }

    /// Execute a queued command on the coordinator itself.
    ///
    /// Broadcast commands belong to the peers, never to the coordinator.
    pub fn run_local(&self, cmd_type: CommandType, cmd: &str) -> Result<String> {
        if cmd_type == CommandType::All {
            return Err(Error::CommandRejected(format!(
                "[{}] coordinator received {} command",
                self.server_id,
                command::ALL
            )));
        }
        Ok(command::execute(cmd, &self.server_id, &self.shutdown))
    }
}
