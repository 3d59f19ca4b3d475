use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrecoError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account blocked by the administrator")]
    AccountBlocked,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error: HTTP {0}")]
    Server(u16),

    #[error("Invalid data file: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupted data file: {}", .0.display())]
    CorruptData(PathBuf),

    #[error("Could not obtain data from any source")]
    DataUnavailable,
}

pub type Result<T> = std::result::Result<T, PrecoError>;
