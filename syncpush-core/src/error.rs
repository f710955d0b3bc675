//! Error types for syncpush-core.

use std::path::PathBuf;

use thiserror::Error;

/// A caller-supplied input is missing or malformed.
///
/// Raised before any mutation of the working tree. Every variant names the
/// offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input `path`: directory {path} does not exist")]
    PathMissing { path: PathBuf },

    #[error("input `path`: {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("input `path`: {path} is not a git working tree")]
    NotAWorkTree { path: PathBuf },

    #[error("input `commit_message` is required and must not be empty")]
    EmptyCommitMessage,

    #[error("input `max_retries`: expected a positive integer, got '{value}'")]
    InvalidMaxRetries { value: String },

    #[error("input `retry_delay`: expected a non-negative integer of milliseconds, got '{value}'")]
    InvalidRetryDelay { value: String },

    #[error("input `{input}` must not be empty")]
    EmptyInput { input: &'static str },

    #[error("input `conflict_strategy`: unknown strategy '{value}'; expected: local, upstream")]
    UnknownStrategy { value: String },

    #[error("working tree {path} is on a detached HEAD; check out a branch first")]
    DetachedHead { path: PathBuf },

    #[error("working tree {path} has a rebase in progress; finish or abort it first")]
    RebaseInProgress { path: PathBuf },

    #[error("working tree {path} has unresolved merge entries: {}", .paths.join(", "))]
    UnmergedPaths { path: PathBuf, paths: Vec<String> },
}

/// Failures while loading a YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with file path and serde_yaml line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },
}
