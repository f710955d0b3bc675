//! Domain types shared by the engine, the VCS backend, and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Full hex object name of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitSha(pub String);

impl CommitSha {
    /// First seven characters, for human output.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitSha {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitSha {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A branch name without the `refs/heads/` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub const DEFAULT_USER_NAME: &str = "github-actions[bot]";
pub const DEFAULT_USER_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

/// Author and committer identity used for every commit the engine creates,
/// including commits rewritten by a rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: DEFAULT_USER_NAME.to_string(),
            email: DEFAULT_USER_EMAIL.to_string(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which side of a stash-restore conflict wins for a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The stashed (local, newer) version.
    Local,
    /// The version just pulled from upstream.
    Upstream,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Upstream => write!(f, "upstream"),
        }
    }
}

/// Named conflict strategy selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    #[default]
    Local,
    Upstream,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStrategy::Local => write!(f, "local"),
            ConflictStrategy::Upstream => write!(f, "upstream"),
        }
    }
}

// ---------------------------------------------------------------------------
// Working tree + retry budget
// ---------------------------------------------------------------------------

/// The local checkout the engine operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTree {
    pub path: PathBuf,
    pub branch: BranchName,
    pub dirty: bool,
}

/// Bounded number of push attempts.
///
/// `max_attempts` is the total number of pushes allowed; a budget of 1 means a
/// single push and no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    used: u32,
}

impl RetryBudget {
    /// `max_attempts` must be positive; validation guarantees this upstream.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            used: 0,
        }
    }

    /// Consume one attempt. Returns `false` once the budget is spent.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max_attempts {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Successful result of one protocol run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Whether a new commit was created and published.
    pub committed: bool,
    /// Published commit; `None` when nothing was committed.
    pub commit_sha: Option<CommitSha>,
    pub branch: BranchName,
    pub author: Identity,
    /// Paths included in the commit, relative to the repository root.
    pub files: Vec<PathBuf>,
    /// Push attempts made (0 for a no-op).
    pub attempts: u32,
    pub finished_at: DateTime<Utc>,
}

impl SyncOutcome {
    /// Outcome for a run that found nothing to commit.
    pub fn no_op(branch: BranchName, author: Identity) -> Self {
        Self {
            committed: false,
            commit_sha: None,
            branch,
            author,
            files: Vec::new(),
            attempts: 0,
            finished_at: Utc::now(),
        }
    }

    /// `commit_sha` output value: the SHA, or an empty string.
    pub fn commit_sha_output(&self) -> &str {
        self.commit_sha.as_ref().map(|s| s.0.as_str()).unwrap_or("")
    }
}
