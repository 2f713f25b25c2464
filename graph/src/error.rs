use thiserror::Error;
use vcs_log_protocol::CommitId;
use vcs_log_protocol::ProtocolError;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("commit {0} is listed more than once")]
    DuplicateCommit(CommitId),

    #[error("invalid snapshot data: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("snapshot fixture could not be decoded: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// A computation observed its cancellation token and stopped early.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("computation cancelled")]
pub struct Cancelled;

/// Why a visible graph could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("filter rejected: {0}")]
    InvalidFilter(#[from] ProtocolError),
}
