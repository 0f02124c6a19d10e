//! Configuration for meerkat components
//!
//! Values come from an optional TOML file and are then overridden by the
//! command line. The monitor constants below are the compiled-in defaults;
//! no environment source is consulted.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Registry capacity bound (rows scanned in the status table)
pub const MAX_SPIDERS: usize = 20;
/// Consecutive same-status failures needed to advance one rung
pub const TRANS_COUNT: u32 = 3;
/// Heartbeat timer period, seconds
pub const TIMER_TIME_SECS: u64 = 5;
/// Per-peer poll deadline, milliseconds
pub const CHILD_KAT_CALL_TIMEOUT_MS: u64 = 3000;
/// First data row of the status table
pub const STATUS_TABLE_Y: u32 = 5;
/// First data row of the command queue
pub const COMMAND_TABLE_Y: u32 = 5;
/// Command queue capacity
pub const MAX_COMMANDS: usize = 20;
/// Upper bound accepted for `max_spiders` and `max_commands`
pub const MAX_TABLE_ROWS: usize = 1000;
/// Delay between `$kill you` and process exit, seconds
pub const KILL_GRACE_SECS: u64 = 5;
/// Port the node service binds by default
pub const DEFAULT_NODE_PORT: u16 = 4096;

/// Default config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "meerkat.toml";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node-specific config
    pub node: NodeConfig,

    /// Status table service config
    pub table: TableConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            table: TableConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let source = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let loaded: Config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        loaded.node.monitor.validate()?;
        Ok(loaded)
    }
}

/// Monitor tuning shared by every node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub max_spiders: usize,
    pub trans_count: u32,
    pub timer_time_secs: u64,
    pub child_kat_call_timeout_ms: u64,
    pub status_table_y: u32,
    pub command_table_y: u32,
    pub max_commands: usize,
    pub kill_grace_secs: u64,
    pub status_sheet: String,
    pub command_sheet: String,
    pub result_sheet: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_spiders: MAX_SPIDERS,
            trans_count: TRANS_COUNT,
            timer_time_secs: TIMER_TIME_SECS,
            child_kat_call_timeout_ms: CHILD_KAT_CALL_TIMEOUT_MS,
            status_table_y: STATUS_TABLE_Y,
            command_table_y: COMMAND_TABLE_Y,
            max_commands: MAX_COMMANDS,
            kill_grace_secs: KILL_GRACE_SECS,
            status_sheet: "Status".to_string(),
            command_sheet: "Command".to_string(),
            result_sheet: "Result".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn timer_period(&self) -> Duration {
        Duration::from_secs(self.timer_time_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.child_kat_call_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }

    /// Row of the coordinator-announcement cell (two rows above the table)
    pub fn announcement_row(&self) -> u32 {
        self.status_table_y - 2
    }

    /// Last row covered by the status table
    pub fn status_last_row(&self) -> u32 {
        self.status_table_y + (self.max_spiders as u32 - 1)
    }

    /// Last row covered by the command queue
    pub fn command_last_row(&self) -> u32 {
        self.command_table_y + (self.max_commands as u32 - 1)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.status_table_y < 3 {
            return Err(crate::Error::InvalidConfig(
                "status_table_y must leave room for the announcement cell (>= 3)".into(),
            ));
        }
        if self.max_spiders == 0 || self.max_commands == 0 {
            return Err(crate::Error::InvalidConfig(
                "max_spiders and max_commands must be positive".into(),
            ));
        }
        if self.max_spiders > MAX_TABLE_ROWS || self.max_commands > MAX_TABLE_ROWS {
            return Err(crate::Error::InvalidConfig(format!(
                "max_spiders and max_commands must not exceed {}",
                MAX_TABLE_ROWS
            )));
        }
        if self.command_table_y == 0 {
            return Err(crate::Error::InvalidConfig("command_table_y must be positive".into()));
        }
        let fits = |first: u32, rows: usize| {
            u64::from(first) + rows as u64 - 1 <= u64::from(u32::MAX)
        };
        if !fits(self.status_table_y, self.max_spiders)
            || !fits(self.command_table_y, self.max_commands)
        {
            return Err(crate::Error::InvalidConfig(
                "status or command table extends past the last addressable row".into(),
            ));
        }
        if self.trans_count == 0 {
            return Err(crate::Error::InvalidConfig("trans_count must be positive".into()));
        }
        if self.timer_time_secs == 0 || self.child_kat_call_timeout_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "timer_time_secs and child_kat_call_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Bind address for the gRPC health/command service
    pub grpc_addr: SocketAddr,

    /// Host peers use to reach this node; becomes part of the ServerID
    pub advertise_host: String,

    /// Base URL of the status table service
    pub table_url: String,

    pub monitor: MonitorConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_NODE_PORT)),
            advertise_host: "127.0.0.1".to_string(),
            table_url: "http://127.0.0.1:4097".to_string(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// Status table service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Bind address for the HTTP table API
    pub bind_addr: SocketAddr,

    /// RocksDB path for the table cells
    pub db_path: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4097)),
            db_path: PathBuf::from("./table-data"),
        }
    }
}
