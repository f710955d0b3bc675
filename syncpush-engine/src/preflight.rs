//! Read-only checks that run before anything touches the working tree.

use syncpush_core::{SyncConfig, ValidationError, WorkingTree};
use syncpush_vcs::VcsBackend;

use crate::error::EngineError;
use crate::stash::STASH_PREFIX;

/// Confirm the configured directory is a working tree the protocol can run
/// in, and describe it.
///
/// Fails with [`EngineError::Validation`] when it is not a work tree, sits on a
/// detached HEAD, or is in the middle of a rebase or merge. Stash entries left
/// behind by an interrupted run are reported but do not block.
pub fn validate<B>(vcs: &B, config: &SyncConfig) -> Result<WorkingTree, EngineError>
where
    B: VcsBackend + ?Sized,
{
    let path = config.path.clone();

    if !vcs.is_work_tree()? {
        return Err(ValidationError::NotAWorkTree { path }.into());
    }
    let Some(branch) = vcs.current_branch()? else {
        return Err(ValidationError::DetachedHead { path }.into());
    };
    if vcs.rebase_in_progress()? {
        return Err(ValidationError::RebaseInProgress { path }.into());
    }
    let unmerged = vcs.unmerged_paths()?;
    if !unmerged.is_empty() {
        return Err(ValidationError::UnmergedPaths {
            path,
            paths: unmerged.iter().map(|p| p.display().to_string()).collect(),
        }
        .into());
    }

    for orphan in vcs
        .stash_list()?
        .into_iter()
        .filter(|s| s.message.starts_with(STASH_PREFIX))
    {
        tracing::warn!(
            stash = %orphan.reference,
            label = %orphan.message,
            "stash left by an earlier interrupted run; recover it with `git stash pop`"
        );
    }

    let dirty = vcs.is_dirty()?;
    tracing::debug!(path = %path.display(), %branch, dirty, "work tree checked");
    Ok(WorkingTree {
        path,
        branch,
        dirty,
    })
}
