//! Error types for syncpush-vcs.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the version-control backend.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The `git` process could not be started at all.
    #[error("failed to run `git {args}` in {cwd}: {source}")]
    Spawn {
        args: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited unsuccessfully.
    #[error("`git {args}` failed ({status}): {stderr}")]
    Command {
        args: String,
        status: String,
        stderr: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote refused the push for a reason other than a lost race
    /// (protected branch, pre-receive hook, permissions).
    #[error("push refused by remote: {reason}")]
    PushRefused { reason: String },

    /// `git` output did not have the expected shape.
    #[error("unexpected output from `git {args}`: {detail}")]
    Parse { args: String, detail: String },
}

/// Convenience constructor for [`VcsError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> VcsError {
    VcsError::Io {
        path: path.into(),
        source,
    }
}
