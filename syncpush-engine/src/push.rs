//! Bounded push-retry loop.
//!
//! The loop only ever retries a non-fast-forward rejection. Each retry is
//! strictly sequential: back off, fetch, rebase the already-created commit
//! onto the new tip, push again. Anything else (a rebase conflict, a hook
//! refusal, a transport error) ends the loop with an error.

use std::time::Duration;

use syncpush_core::{BranchName, CommitSha, RetryBudget};
use syncpush_vcs::{PushOutcome, VcsBackend};

use crate::error::EngineError;
use crate::resolver::ConflictResolver;
use crate::sync::pull_rebase_preserving;

/// How the loop ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The remote accepted `sha` on attempt number `attempts`.
    Pushed { sha: CommitSha, attempts: u32 },
    /// Every attempt in the budget was rejected.
    Exhausted { attempts: u32 },
}

/// Delay before retry number `attempt` (1-based count of failed attempts).
pub fn backoff(retry_delay: Duration, attempt: u32) -> Duration {
    retry_delay.saturating_mul(attempt)
}

/// Push HEAD to `<remote>/<branch>` until accepted or `budget` runs out.
///
/// `sleep` is called with the backoff before every retry; pass
/// `std::thread::sleep` in production.
pub fn push_with_retry<B, S>(
    vcs: &B,
    resolver: &dyn ConflictResolver,
    remote: &str,
    branch: &BranchName,
    budget: &mut RetryBudget,
    retry_delay: Duration,
    mut sleep: S,
) -> Result<LoopExit, EngineError>
where
    B: VcsBackend + ?Sized,
    S: FnMut(Duration),
{
    while budget.try_consume() {
        let attempt = budget.used();
        let sha = vcs.head()?;
        tracing::info!(
            sha = sha.short(),
            %remote,
            %branch,
            attempt,
            max_attempts = budget.max_attempts(),
            "pushing"
        );

        match vcs.push(remote, branch)? {
            PushOutcome::Pushed => return Ok(LoopExit::Pushed { sha, attempts: attempt }),
            PushOutcome::Rejected if budget.remaining() == 0 => break,
            PushOutcome::Rejected => {
                let delay = backoff(retry_delay, attempt);
                tracing::warn!(
                    %remote,
                    %branch,
                    delay_ms = delay.as_millis() as u64,
                    "push rejected because the remote moved; rebasing and retrying"
                );
                if !delay.is_zero() {
                    sleep(delay);
                }
                pull_rebase_preserving(vcs, resolver, remote, branch, "push retry")?;
            }
        }
    }

    tracing::error!(
        %remote,
        %branch,
        attempts = budget.used(),
        "push rejected on every attempt; giving up"
    );
    Ok(LoopExit::Exhausted {
        attempts: budget.used(),
    })
}
