//! # syncpush-vcs
//!
//! The version-control capability the sync engine is written against.
//!
//! [`VcsBackend`] exposes stash, fetch, rebase, staging, commit and push
//! primitives; [`GitCli`] implements it on top of the `git` binary.

pub mod backend;
pub mod error;
pub mod git;
pub mod porcelain;

pub use backend::{
    PushOutcome, RebaseOutcome, StageResult, StagedFile, StashInfo, StashPop, VcsBackend,
};
pub use error::VcsError;
pub use git::GitCli;
