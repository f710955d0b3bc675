//! # syncpush-engine
//!
//! The sync-commit-push protocol, written against
//! [`syncpush_vcs::VcsBackend`]:
//!
//! 1. [`preflight`] checks the tree without touching it.
//! 2. [`stash`] parks uncommitted work while [`sync`] fetches and rebases.
//! 3. The work is restored; stash conflicts go to a [`resolver`].
//! 4. [`stage`] stages the configured pathspecs and refuses conflict markers.
//! 5. One commit is created and [`push`] publishes it within a retry budget.
//!
//! [`pipeline::run`] drives all of it.

pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod push;
pub mod resolver;
pub mod stage;
pub mod stash;
pub mod sync;

#[cfg(test)]
mod fake;

pub use error::{exit_codes, EngineError, MarkerFinding};
pub use pipeline::{run, SyncSession};
pub use push::LoopExit;
pub use resolver::{for_strategy, ConflictResolver, PreferLocal, PreferUpstream};
pub use stash::{RestoreReport, StashGuard, STASH_PREFIX};
