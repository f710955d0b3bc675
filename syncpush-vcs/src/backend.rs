//! The capability the sync engine needs from a version-control system.
//!
//! Every method takes `&self`: a backend is a handle onto one working tree and
//! the engine drives it strictly sequentially. Paths are relative to the
//! repository root.

use std::path::{Path, PathBuf};

use syncpush_core::{BranchName, CommitSha, Identity, Side};

use crate::error::VcsError;

/// Result of reapplying the most recent stash entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashPop {
    /// Applied cleanly; the entry has been removed from the stash list.
    Applied,
    /// Applied with conflicts in these paths. The entry is still on the stash
    /// list and the index holds unmerged entries until
    /// [`VcsBackend::reset_index`] runs.
    Conflicted(Vec<PathBuf>),
}

/// Result of replaying local commits onto the fetched upstream tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// HEAD is now upstream tip plus any local-only commits.
    Rebased,
    /// Replaying committed history conflicted in these paths. The backend has
    /// already aborted the rebase, so HEAD is back where it started.
    Conflict(Vec<PathBuf>),
}

/// Result of publishing HEAD to the remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote tip advanced since the last fetch (non-fast-forward).
    Rejected,
}

/// Result of staging one pathspec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageResult {
    Staged,
    /// The pattern matched no files; nothing was added.
    NoMatch,
}

/// One entry of the index-vs-HEAD diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// Staged as a deletion; there is no content to inspect.
    pub deleted: bool,
}

/// A stash entry as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashInfo {
    /// Backend reference, e.g. `stash@{0}`.
    pub reference: String,
    /// Message the entry was saved with.
    pub message: String,
}

/// Version-control primitives used by the sync protocol.
pub trait VcsBackend {
    // -- inspection ---------------------------------------------------------

    /// Whether the configured directory is inside a working tree.
    fn is_work_tree(&self) -> Result<bool, VcsError>;

    /// Checked-out branch, or `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<BranchName>, VcsError>;

    fn rebase_in_progress(&self) -> Result<bool, VcsError>;

    /// Paths with unmerged index entries.
    fn unmerged_paths(&self) -> Result<Vec<PathBuf>, VcsError>;

    /// Any tracked modification or untracked (non-ignored) file.
    fn is_dirty(&self) -> Result<bool, VcsError>;

    fn head(&self) -> Result<CommitSha, VcsError>;

    // -- stash --------------------------------------------------------------

    fn stash_list(&self) -> Result<Vec<StashInfo>, VcsError>;

    /// Stash tracked and untracked changes. Returns `false` when there was
    /// nothing to save.
    fn stash_save(&self, message: &str) -> Result<bool, VcsError>;

    /// Reapply and remove the most recent stash entry.
    fn stash_pop(&self) -> Result<StashPop, VcsError>;

    /// Untracked paths saved in the most recent stash entry that now exist
    /// in the working tree. Git refuses to pop over any of them.
    fn stash_untracked_collisions(&self) -> Result<Vec<PathBuf>, VcsError>;

    /// Point `reference` at the most recent stash entry, then drop the entry.
    fn stash_archive(&self, reference: &str) -> Result<(), VcsError>;

    /// Resolve one conflicted path by taking `side` wholesale.
    fn take_side(&self, path: &Path, side: Side) -> Result<(), VcsError>;

    /// Reset the index to HEAD, keeping working-tree content. Clears unmerged
    /// state and unstages everything.
    fn reset_index(&self) -> Result<(), VcsError>;

    /// Discard the most recent stash entry.
    fn stash_drop(&self) -> Result<(), VcsError>;

    /// Delete `path` from the working tree only; the index is untouched.
    fn remove_path(&self, path: &Path) -> Result<(), VcsError>;

    /// Overwrite the working-tree copy of `path` with HEAD's version.
    fn checkout_head(&self, path: &Path) -> Result<(), VcsError>;

    // -- sync ---------------------------------------------------------------

    fn fetch(&self, remote: &str, branch: &BranchName) -> Result<(), VcsError>;

    /// Rebase the current branch onto `<remote>/<branch>`.
    fn rebase(&self, remote: &str, branch: &BranchName) -> Result<RebaseOutcome, VcsError>;

    // -- staging + commit ---------------------------------------------------

    /// Stage additions, modifications and deletions matching `pattern`.
    fn stage(&self, pattern: &str) -> Result<StageResult, VcsError>;

    /// Index-vs-HEAD diff. Empty means nothing to commit.
    fn staged_changes(&self) -> Result<Vec<StagedFile>, VcsError>;

    /// Content of `path` as recorded in the index.
    fn read_staged(&self, path: &Path) -> Result<Vec<u8>, VcsError>;

    fn commit(&self, author: &Identity, message: &str) -> Result<CommitSha, VcsError>;

    /// Move the branch back to HEAD's first parent, keeping the commit's
    /// changes as unstaged working-tree modifications.
    fn uncommit_head(&self) -> Result<(), VcsError>;

    // -- publish ------------------------------------------------------------

    /// Push HEAD to `refs/heads/<branch>` on `remote`.
    fn push(&self, remote: &str, branch: &BranchName) -> Result<PushOutcome, VcsError>;
}
