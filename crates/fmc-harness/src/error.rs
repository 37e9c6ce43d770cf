//! Harness error types

use std::path::PathBuf;

/// Errors reading harness inputs
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// IO error with path context
    #[error("IO error at {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File content could not be parsed
    #[error("invalid {what}: {message}")]
    Parse {
        /// Kind of file
        what: &'static str,
        /// Parser message
        message: String,
    },

    /// A manifest entry has no binding and the manifest no default
    #[error("submission '{0}' has no binding and the manifest declares no default")]
    MissingBinding(String),
}

impl HarnessError {
    /// Create IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
