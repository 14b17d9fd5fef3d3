//! Error taxonomy for the bounded sink.
//!
//! Every variant carries enough context (source name, output path, commit
//! stage) for the CLI to render a message without re-deriving anything.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Step of an atomic commit that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    CreateTemp,
    Write,
    Sync,
    Rename,
}

impl CommitStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitStage::CreateTemp => "create temp file",
            CommitStage::Write => "write temp file",
            CommitStage::Sync => "sync temp file",
            CommitStage::Rename => "rename into place",
        }
    }
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the limit, window, writer and drivers.
#[derive(Debug, Error)]
pub enum Error {
    /// Zero bound, or both / neither of size and lines requested.
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    /// Opening or reading the input failed. The window is discarded.
    #[error("failed to read {source_name}: {error}")]
    SourceReadFailed {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// A commit failed before the rename; the output path is unmodified.
    #[error("failed to commit {} ({stage}): {error}", .path.display())]
    CommitFailed {
        path: PathBuf,
        stage: CommitStage,
        #[source]
        error: std::io::Error,
    },

    /// The output directory is missing or cannot be written.
    #[error("output directory {} is not usable: {error}", .dir.display())]
    PathError {
        dir: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl Error {
    /// Whether this is a commit-side failure (`CommitFailed` or `PathError`).
    ///
    /// The follow driver applies its retry policy only to these.
    pub fn is_commit_error(&self) -> bool {
        matches!(self, Error::CommitFailed { .. } | Error::PathError { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
