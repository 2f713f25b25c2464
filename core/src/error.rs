use std::path::PathBuf;

use thiserror::Error;
use vcs_log_graph::GraphError;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("commit snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid filters: {0}")]
    InvalidFilter(#[from] vcs_log_protocol::ProtocolError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("tracing subscriber could not be installed: {0}")]
    Telemetry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;
