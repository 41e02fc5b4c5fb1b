use crate::chess::ChessError;
use crate::config::ConfigError;

/// Failures that stop the server. Per-message rejections are
/// `SessionError`s and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Chess error: {0}")]
    Chess(#[from] ChessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;
