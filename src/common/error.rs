//! Error types for meerkat

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Network Errors ===
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Status Table Errors ===
    #[error("Status table error: {0}")]
    Table(String),

    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    #[error("No free row in the status table (capacity {0})")]
    NoFreeRow(usize),

    // === Command Errors ===
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Did the remote side fail to answer at all?
    ///
    /// Transport failures drive the failure ladder; every other error is a
    /// local or persistence problem.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Unreachable { .. } | Error::Timeout(_) | Error::Grpc(_)
        )
    }

    /// Convert to gRPC status for RPC responses
    pub fn to_grpc_status(&self) -> tonic::Status {
        use tonic::Code;
        match self {
            Error::CommandRejected(_) => {
                tonic::Status::new(Code::FailedPrecondition, self.to_string())
            }
            Error::InvalidCommand(_) | Error::InvalidConfig(_) | Error::InvalidCell(_) => {
                tonic::Status::new(Code::InvalidArgument, self.to_string())
            }
            Error::Timeout(_) => tonic::Status::new(Code::DeadlineExceeded, self.to_string()),
            Error::Unreachable { .. } => tonic::Status::new(Code::Unavailable, self.to_string()),
            Error::Grpc(status) => status.clone(),
            _ => tonic::Status::new(Code::Internal, self.to_string()),
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidCell(_) | Error::InvalidConfig(_) | Error::InvalidCommand(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::NoFreeRow(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(e.to_string())
    }
}
