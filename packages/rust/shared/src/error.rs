//! Error types for fbcorpus.
//!
//! Library crates use [`FbCorpusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Exit code a shell reports when a command cannot be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Top-level error type for all fbcorpus operations.
#[derive(Debug, thiserror::Error)]
pub enum FbCorpusError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A pipeline stage exited non-zero.
    #[error("stage '{stage}' failed with exit code {code}")]
    StageFailed { stage: String, code: i32 },

    /// A stage program could not be started at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Input validation error (bad URL, empty target, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FbCorpusError>;

impl FbCorpusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code the CLI should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StageFailed { code, .. } => *code,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                EXIT_COMMAND_NOT_FOUND
            }
            _ => 1,
        }
    }
}
