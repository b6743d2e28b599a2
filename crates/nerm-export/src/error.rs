use std::fmt;
use std::path::{Path, PathBuf};

use nerm_core::CoreError;
use thiserror::Error;

/// Errors raised while fetching pages or writing export files
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Record(#[from] CoreError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExportError {
    /// Create a new Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a new Io error bound to the file it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Http { .. } => ErrorCategory::Transport,
            Self::Decode(_) | Self::Record(_) => ErrorCategory::Decode,
            Self::Io { .. } | Self::Csv(_) => ErrorCategory::Filesystem,
            Self::InvalidRequest(_) => ErrorCategory::Request,
        }
    }
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

/// Coarse error classes used in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Decode,
    Filesystem,
    Request,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Request => write!(f, "request"),
        }
    }
}

/// Convenience result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;
