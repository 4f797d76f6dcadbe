//! Error types for filedeck

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using filedeck's Error
pub type Result<T> = std::result::Result<T, Error>;

/// filedeck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Path not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Path is outside the sandbox: {}", .path.display())]
    OutsideSandbox { path: PathBuf },

    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("IO error at {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File is not valid UTF-8: {}", .path.display())]
    NotUtf8 { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Background task failed: {message}")]
    TaskFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Wrap an I/O error on an entry a client asked for by name.
    ///
    /// A missing entry, or one that would sit below a regular file, becomes
    /// [`Error::NotFound`]. Anything else stays an [`Error::IoAt`].
    pub fn at_entry(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        let under_file = path.ancestors().skip(1).any(|a| a.is_file());
        if source.kind() == io::ErrorKind::NotFound || under_file {
            Error::NotFound { path }
        } else {
            Error::IoAt { path, source }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// True when the caller, not the server, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::OutsideSandbox { .. } | Error::Validation { .. }
        )
    }
}
