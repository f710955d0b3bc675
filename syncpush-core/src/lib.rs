//! syncpush core library: domain types, configuration, validation errors.
//!
//! - [`types`]: newtypes, identity, retry budget, outcome
//! - [`config`]: raw inputs, YAML file loading, [`SyncConfig`] validation
//! - [`error`]: [`ValidationError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{RawInputs, SyncConfig};
pub use error::{ConfigError, ValidationError};
pub use types::{
    BranchName, CommitSha, ConflictStrategy, Identity, RetryBudget, Side, SyncOutcome,
    WorkingTree,
};
