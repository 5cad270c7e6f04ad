//! Wiki transfer error types.

use thiserror::Error;

/// Errors that can occur while transferring a wiki.
#[derive(Debug, Error)]
pub enum WikiError {
    /// The repository has no usable SSH URL.
    #[error("Cannot derive wiki remote from '{0}'")]
    InvalidRemote(String),

    /// Scratch directory could not be created.
    #[error("Failed to create working directory: {0}")]
    TempDir(#[source] std::io::Error),

    /// `git` could not be started.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `git` exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },
}
