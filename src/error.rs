use std::io;

use thiserror::Error;

/// Failure of a single collector while sampling one tick.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{key} collector failed: {reason}")]
    Sample { key: String, reason: String },

    #[error("{key} collector task failed: {source}")]
    Join {
        key: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl CollectorError {
    pub fn sample(key: &str, reason: impl Into<String>) -> Self {
        CollectorError::Sample {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a snapshot store backend.
///
/// An empty result is never an error; backends only fail when they cannot be
/// reached at all.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a discarded collection tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid {param} parameter {value:?}: expected unix seconds")]
    InvalidTime { param: &'static str, value: String },

    #[error("invalid limit parameter {0:?}: expected a positive integer")]
    InvalidLimit(String),

    #[error("no snapshots collected yet")]
    NoDataAvailable,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl QueryError {
    /// Whether the error was caused by the request rather than the agent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QueryError::InvalidTime { .. } | QueryError::InvalidLimit(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    #[error("invalid config value: {0}")]
    Invalid(String),

    #[error("config file {0} already exists")]
    AlreadyExists(String),

    #[error("no config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent responded with {status}: {message}")]
    Remote { status: u16, message: String },
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;
