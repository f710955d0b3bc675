//! One protocol run, start to finish.
//!
//! ```text
//! preflight ─▶ snapshot ─▶ fetch+rebase ─▶ restore ─▶ stage ─▶ marker guard
//!                                                               │
//!                                          nothing staged ◀─────┤
//!                                          (no-op success)      ▼
//!                                                    commit ─▶ push loop
//! ```
//!
//! Once a commit exists, any failure moves the branch back off it so the
//! changes are left in the working tree rather than in an unpublished commit.

use std::time::Duration;

use chrono::Utc;
use syncpush_core::{BranchName, CommitSha, RetryBudget, SyncConfig, SyncOutcome, WorkingTree};
use syncpush_vcs::VcsBackend;

use crate::error::EngineError;
use crate::preflight;
use crate::push::{push_with_retry, LoopExit};
use crate::resolver::ConflictResolver;
use crate::stage::{check_markers, stage_patterns, StagedChangeSet};
use crate::stash::RestoreReport;
use crate::sync::pull_rebase_preserving;

/// State carried through a run: the validated tree, its configuration, the
/// conflict policy and the push budget.
pub struct SyncSession<'a, B: VcsBackend + ?Sized> {
    vcs: &'a B,
    config: &'a SyncConfig,
    resolver: &'a dyn ConflictResolver,
    tree: WorkingTree,
    budget: RetryBudget,
}

impl<'a, B: VcsBackend + ?Sized> SyncSession<'a, B> {
    /// Run preflight checks and open a session. Nothing is mutated.
    pub fn start(
        vcs: &'a B,
        config: &'a SyncConfig,
        resolver: &'a dyn ConflictResolver,
    ) -> Result<Self, EngineError> {
        let tree = preflight::validate(vcs, config)?;
        Ok(Self {
            vcs,
            config,
            resolver,
            tree,
            budget: RetryBudget::new(config.max_retries),
        })
    }

    pub fn tree(&self) -> &WorkingTree {
        &self.tree
    }

    pub fn run(self) -> Result<SyncOutcome, EngineError> {
        self.run_with_sleep(std::thread::sleep)
    }

    /// [`run`](Self::run) with an injectable sleep for the push backoff.
    pub fn run_with_sleep<S>(mut self, sleep: S) -> Result<SyncOutcome, EngineError>
    where
        S: FnMut(Duration),
    {
        let config = self.config;
        let branch = self.tree.branch.clone();
        let remote = config.remote.as_str();
        tracing::info!(
            path = %self.tree.path.display(),
            %remote,
            %branch,
            "syncing work tree"
        );

        match pull_rebase_preserving(self.vcs, self.resolver, remote, &branch, "pre-sync")? {
            RestoreReport::Resolved(paths) => tracing::info!(
                resolved = paths.len(),
                "restored local changes with conflicts resolved"
            ),
            RestoreReport::Applied => tracing::info!("restored local changes"),
            RestoreReport::Nothing => {}
        }

        let staged = stage_patterns(self.vcs, &config.file_patterns)?;
        check_markers(self.vcs)?;
        if staged.is_empty() {
            tracing::info!("no changes to commit");
            return Ok(SyncOutcome::no_op(branch, config.identity.clone()));
        }

        let sha = self.vcs.commit(&config.identity, &config.commit_message)?;
        tracing::info!(
            sha = sha.short(),
            files = staged.files.len(),
            author = %config.identity,
            "committed"
        );

        match self.publish(&branch, sleep) {
            Ok(LoopExit::Pushed { sha, attempts }) => {
                tracing::info!(sha = sha.short(), %remote, %branch, "pushed");
                Ok(self.outcome(branch, sha, staged, attempts))
            }
            Ok(LoopExit::Exhausted { attempts }) => {
                self.rollback();
                Err(EngineError::PushRaceExhausted {
                    upstream: format!("{remote}/{branch}"),
                    attempts,
                })
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn publish<S>(&mut self, branch: &BranchName, sleep: S) -> Result<LoopExit, EngineError>
    where
        S: FnMut(Duration),
    {
        push_with_retry(
            self.vcs,
            self.resolver,
            &self.config.remote,
            branch,
            &mut self.budget,
            self.config.retry_delay,
            sleep,
        )
    }

    /// Best effort: drop the unpublished commit, keeping its changes.
    fn rollback(&self) {
        match self.vcs.uncommit_head() {
            Ok(()) => tracing::warn!("unpublished commit removed; changes kept in the working tree"),
            Err(e) => tracing::error!(error = %e, "failed to remove unpublished commit"),
        }
    }

    fn outcome(
        &self,
        branch: BranchName,
        sha: CommitSha,
        staged: StagedChangeSet,
        attempts: u32,
    ) -> SyncOutcome {
        SyncOutcome {
            committed: true,
            commit_sha: Some(sha),
            branch,
            author: self.config.identity.clone(),
            files: staged.files,
            attempts,
            finished_at: Utc::now(),
        }
    }
}

/// Validate, sync, commit and publish in one call.
pub fn run<B>(
    vcs: &B,
    config: &SyncConfig,
    resolver: &dyn ConflictResolver,
) -> Result<SyncOutcome, EngineError>
where
    B: VcsBackend + ?Sized,
{
    SyncSession::start(vcs, config, resolver)?.run()
}
