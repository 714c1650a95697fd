//! Closed error taxonomy for the core.
//!
//! Callers need to match on *kind* -- a module missing vs. a script timing
//! out vs. a path escaping its sandbox each warrant different handling --
//! so this is a typed enum rather than an opaque boxed error.

use std::path::PathBuf;
use std::time::Duration;

/// The closed set of error kinds the core can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid version {value:?}: {reason}")]
    InvalidVersion { value: String, reason: String },

    #[error("invalid bump type: {0}")]
    InvalidBumpType(String),

    #[error("permission denied: {op} on {path}")]
    PermissionDenied { op: String, path: PathBuf },

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("git operation failed: {0}")]
    GitOperation(String),

    #[error("extension {extension} failed during {operation}: {source}")]
    Extension {
        extension: String,
        operation: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{op} failed on {path}: {source}")]
    FileOp {
        op: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("path {path} escapes {root}")]
    PathValidation { path: PathBuf, root: PathBuf },
}

impl Error {
    pub fn file_op(op: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Error::PermissionDenied { op: op.to_string(), path };
        }
        Error::FileOp { op: op.to_string(), path, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
