//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    #[error("database not found at {path}. Run 'sift import' first")]
    DatabaseNotFound { path: PathBuf },

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(String),

    /// An argument could not be parsed.
    #[error("invalid {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Visibility tables failed to load.
    #[error(transparent)]
    Visibility(#[from] visibility::Error),

    /// Serialization failed.
    #[error(transparent)]
    Engine(#[from] engine::Error),

    /// An error occurred in the record store.
    #[error(transparent)]
    Records(#[from] records::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from incorrect setup rather than bad input
    /// or a failing store.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Visibility(visibility::Error::Configuration(_)) => true,
            Error::Engine(err) => err.is_configuration(),
            _ => false,
        }
    }

    /// Process exit code: 2 for configuration errors, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() { 2 } else { 1 }
    }
}

impl From<visibility::ConfigurationError> for Error {
    fn from(err: visibility::ConfigurationError) -> Self {
        Error::Visibility(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
