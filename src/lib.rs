//! # meerkat
//!
//! Fleet health monitor with transient coordinator election:
//! - Every node runs a resettable heartbeat timer
//! - A node whose timer elapses unreset coordinates one polling round
//! - The coordinator polls every registered peer over gRPC, concurrently
//! - A per-peer failure ladder (L → N → Z → D) with hysteresis
//! - Observed state lives in a shared, spreadsheet-like status table
//! - Queued commands, including remote self-termination
//!
//! There is no consensus protocol. Two nodes may coordinate the same round;
//! their writes are idempotent and the last writer wins.
//!
//! ## Architecture
//!
//! ```text
//!          ┌───────────────────────────────┐
//!          │     Status table service      │
//!          │  (HTTP, RocksDB-persisted)    │
//!          └──────┬──────────┬─────────────┘
//!                 │ HTTP     │
//!   ┌─────────────▼┐   ┌─────▼────────┐   ┌──────────────┐
//!   │ node A       │   │ node B       │   │ node C       │
//!   │ (coordinator)├──▶│ timer reset  │   │ unreachable  │
//!   │  this round  ├───┼──────────────┼──▶│  → N, Z, D   │
//!   └──────────────┘   └──────────────┘   └──────────────┘
//!                gRPC GetChildStatus / RunCommand
//! ```
//!
//! ## Usage
//!
//! ### Start the status table
//! ```bash
//! meerkat-table --bind 0.0.0.0:4097 --db ./table-data
//! ```
//!
//! ### Start nodes
//! ```bash
//! meerkat-node --grpc 0.0.0.0:4096 --advertise-host 10.0.0.5 \
//!   --table-url http://10.0.0.1:4097
//! ```
//!
//! ### Use the CLI
//! ```bash
//! meerkat status
//! meerkat enqueue --type ALL '$whoareu'
//! meerkat exec 10.0.0.5:4096 '$kill you'
//! ```

pub mod common;
pub mod node;
pub mod table;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use node::NodeServer;
pub use table::StatusTable;

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("meerkat");

    /// Encoded descriptors for the reflection service
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("meerkat_descriptor");
}

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
