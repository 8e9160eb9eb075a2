//! Error types for the MSNP command line tool

use msnp_core::MsnpError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] MsnpError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Replay failed: {0}")]
    Replay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<msnp_core::FrameError> for CliError {
    fn from(error: msnp_core::FrameError) -> Self {
        CliError::Protocol(error.into())
    }
}

impl From<msnp_core::ObjectError> for CliError {
    fn from(error: msnp_core::ObjectError) -> Self {
        CliError::Protocol(error.into())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
