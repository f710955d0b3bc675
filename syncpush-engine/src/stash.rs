//! Snapshot and restore of uncommitted work around a rebase.
//!
//! [`StashGuard`] is the only way the engine creates a stash entry. It owns
//! the entry until [`StashGuard::restore`] consumes it; if a fatal error or a
//! panic unwinds past a live guard, `Drop` restores the entry instead, so no
//! exit path leaves a stash behind for the next run.

use std::path::PathBuf;

use chrono::Utc;
use syncpush_core::Side;
use syncpush_vcs::{StashPop, VcsBackend, VcsError};

use crate::resolver::ConflictResolver;

/// Prefix of every stash message the engine writes. Used to recognise
/// entries orphaned by an interrupted run.
pub const STASH_PREFIX: &str = "syncpush:";

/// Handle returned by [`snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// The tree was clean; there is nothing to restore.
    Clean,
    Stashed { message: String },
}

/// What [`restore`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreReport {
    /// The snapshot was the clean sentinel.
    Nothing,
    /// Reapplied without conflicts.
    Applied,
    /// Reapplied with conflicts, each settled by the resolver.
    Resolved(Vec<(PathBuf, Side)>),
}

/// Stash every tracked and untracked modification, or return
/// [`Snapshot::Clean`] when there is none.
pub fn snapshot<B>(vcs: &B, label: &str) -> Result<Snapshot, VcsError>
where
    B: VcsBackend + ?Sized,
{
    if !vcs.is_dirty()? {
        return Ok(Snapshot::Clean);
    }
    let message = format!("{STASH_PREFIX} {label} (pid {})", std::process::id());
    if !vcs.stash_save(&message)? {
        return Ok(Snapshot::Clean);
    }
    tracing::debug!(stash = %message, "stashed local changes");
    Ok(Snapshot::Stashed { message })
}

/// Reapply `snapshot` onto the current HEAD.
///
/// Conflicted paths are settled wholesale by `resolver`, the index is reset so
/// restored content is left as unstaged modifications, and the entry is
/// dropped. Untracked files that upstream has since added are settled the same
/// way before the entry is popped.
///
/// If the entry cannot be reapplied it is moved under
/// `refs/syncpush/rescued/` before the error is returned.
pub fn restore<B>(
    vcs: &B,
    snapshot: Snapshot,
    resolver: &dyn ConflictResolver,
) -> Result<RestoreReport, VcsError>
where
    B: VcsBackend + ?Sized,
{
    let Snapshot::Stashed { message } = snapshot else {
        return Ok(RestoreReport::Nothing);
    };
    match reapply(vcs, resolver) {
        Ok(report) => Ok(report),
        Err(err) => {
            rescue(vcs, &message);
            Err(err)
        }
    }
}

fn reapply<B>(vcs: &B, resolver: &dyn ConflictResolver) -> Result<RestoreReport, VcsError>
where
    B: VcsBackend + ?Sized,
{
    let collisions = vcs.stash_untracked_collisions()?;
    for path in &collisions {
        vcs.remove_path(path)?;
    }

    let pop = match vcs.stash_pop() {
        Ok(pop) => pop,
        Err(err) => {
            for path in &collisions {
                if let Err(e) = vcs.checkout_head(path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to restore upstream copy"
                    );
                }
            }
            return Err(err);
        }
    };

    let mut resolved = Vec::new();
    for path in collisions {
        let side = resolver.resolve(&path);
        tracing::info!(path = %path.display(), %side, "untracked file also added upstream");
        if side == Side::Upstream {
            vcs.checkout_head(&path)?;
        }
        resolved.push((path, side));
    }

    if let StashPop::Conflicted(paths) = pop {
        for path in paths {
            let side = resolver.resolve(&path);
            tracing::info!(path = %path.display(), %side, "stash conflict resolved");
            vcs.take_side(&path, side)?;
            resolved.push((path, side));
        }
        vcs.reset_index()?;
        vcs.stash_drop()?;
    }

    if resolved.is_empty() {
        Ok(RestoreReport::Applied)
    } else {
        Ok(RestoreReport::Resolved(resolved))
    }
}

/// Move our entry out of the stash list so a failed restore leaves nothing
/// behind. The content stays reachable from the archive ref.
fn rescue<B>(vcs: &B, message: &str)
where
    B: VcsBackend + ?Sized,
{
    let ours = match vcs.stash_list() {
        Ok(list) => list.first().is_some_and(|s| s.message.ends_with(message)),
        Err(e) => {
            tracing::error!(error = %e, "failed to list stash entries");
            return;
        }
    };
    if !ours {
        return;
    }
    let reference = format!(
        "refs/syncpush/rescued/{}-{}",
        Utc::now().format("%Y%m%dT%H%M%SZ"),
        std::process::id()
    );
    match vcs.stash_archive(&reference) {
        Ok(()) => tracing::error!(
            reference = %reference,
            "stashed changes could not be reapplied; archived for `git stash apply`"
        ),
        Err(e) => tracing::error!(
            error = %e,
            "failed to archive stashed changes; they remain in the stash list"
        ),
    }
}

// ---------------------------------------------------------------------------
// Scoped guard
// ---------------------------------------------------------------------------

/// Owner of at most one live snapshot.
pub struct StashGuard<'a, B: VcsBackend + ?Sized> {
    vcs: &'a B,
    resolver: &'a dyn ConflictResolver,
    snapshot: Option<Snapshot>,
}

impl<'a, B: VcsBackend + ?Sized> StashGuard<'a, B> {
    /// Take a snapshot and hold it until restored.
    pub fn acquire(
        vcs: &'a B,
        resolver: &'a dyn ConflictResolver,
        label: &str,
    ) -> Result<Self, VcsError> {
        let snapshot = snapshot(vcs, label)?;
        Ok(Self {
            vcs,
            resolver,
            snapshot: Some(snapshot),
        })
    }

    /// Whether a stash entry is held (as opposed to the clean sentinel).
    pub fn is_stashed(&self) -> bool {
        matches!(self.snapshot, Some(Snapshot::Stashed { .. }))
    }

    /// Restore on the normal path, consuming the guard.
    pub fn restore(mut self) -> Result<RestoreReport, VcsError> {
        match self.snapshot.take() {
            Some(snapshot) => restore(self.vcs, snapshot, self.resolver),
            None => Ok(RestoreReport::Nothing),
        }
    }
}

impl<B: VcsBackend + ?Sized> Drop for StashGuard<'_, B> {
    fn drop(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        if snapshot == Snapshot::Clean {
            return;
        }
        tracing::warn!("restoring stashed changes after an aborted sync");
        if let Err(e) = restore(self.vcs, snapshot, self.resolver) {
            tracing::error!(error = %e, "failed to restore stashed changes");
        }
    }
}
