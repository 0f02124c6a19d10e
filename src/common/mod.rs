//! Common utilities and types shared across meerkat

pub mod config;
pub mod error;
pub mod utils;

pub use self::config::{Config, MonitorConfig, NodeConfig, TableConfig};
pub use error::{Error, Result};
pub use utils::{current_time, encode_sheet, make_server_id, parse_count, peer_addr};
