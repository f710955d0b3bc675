//! Fetch + rebase onto the upstream branch.

use syncpush_core::BranchName;
use syncpush_vcs::{RebaseOutcome, VcsBackend};

use crate::error::EngineError;
use crate::resolver::ConflictResolver;
use crate::stash::{RestoreReport, StashGuard};

/// Fetch `<remote>/<branch>` and replay local-only commits on top of it.
///
/// A conflict against committed history is never auto-resolved: the backend
/// has already aborted the rebase and this returns
/// [`EngineError::SyncConflict`].
pub fn pull_rebase<B>(vcs: &B, remote: &str, branch: &BranchName) -> Result<(), EngineError>
where
    B: VcsBackend + ?Sized,
{
    let upstream = format!("{remote}/{branch}");
    tracing::info!(%upstream, "fetching");
    vcs.fetch(remote, branch)?;

    match vcs.rebase(remote, branch)? {
        RebaseOutcome::Rebased => {
            tracing::info!(%upstream, "rebased");
            Ok(())
        }
        RebaseOutcome::Conflict(paths) => {
            tracing::error!(%upstream, paths = paths.len(), "rebase conflicts with committed history");
            Err(EngineError::SyncConflict { upstream, paths })
        }
    }
}

/// [`pull_rebase`] with any uncommitted files parked in a stash for the
/// duration, so a dirty tree never blocks the rebase.
pub fn pull_rebase_preserving<B>(
    vcs: &B,
    resolver: &dyn ConflictResolver,
    remote: &str,
    branch: &BranchName,
    label: &str,
) -> Result<RestoreReport, EngineError>
where
    B: VcsBackend + ?Sized,
{
    let guard = StashGuard::acquire(vcs, resolver, label)?;
    pull_rebase(vcs, remote, branch)?;
    Ok(guard.restore()?)
}
