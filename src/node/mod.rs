//! Monitor node
//!
//! Each node:
//! - Serves liveness polls and remote commands over gRPC
//! - Waits on a resettable heartbeat timer
//! - Coordinates a polling round when its timer elapses unreset
//! - Keeps a per-peer failure ladder in the shared status table

pub mod client;
pub mod command;
pub mod context;
pub mod coordinator;
pub mod grpc;
pub mod ladder;
pub mod queue;
pub mod registry;
pub mod server;
pub mod timer;

pub use client::{GrpcPeerClient, PeerTransport};
pub use command::{Command, CommandType};
pub use context::{NodeContext, Shutdown};
pub use coordinator::{Coordinator, RoundReport};
pub use ladder::{NodeStatus, NodeStatusRow};
pub use queue::{CommandQueue, QueuedCommand};
pub use registry::StatusRegistry;
pub use server::NodeServer;
pub use timer::{HeartbeatTimer, TimerOutcome};
