use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid commit hash {0:?}: expected hexadecimal digits")]
    InvalidHash(String),

    #[error("invalid root id {0:?}")]
    InvalidRoot(String),

    #[error("invalid text filter regex {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
