//! Error types for syncpush-engine.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use syncpush_core::ValidationError;
use syncpush_vcs::VcsError;

/// Process exit codes, one per failure class.
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const VCS_FAILURE: u8 = 1;
    pub const VALIDATION: u8 = 2;
    pub const SYNC_CONFLICT: u8 = 3;
    pub const CORRUPTION_GUARD: u8 = 4;
    pub const PUSH_RACE_EXHAUSTED: u8 = 5;
}

/// One conflict marker found in staged content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFinding {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub marker: &'static str,
}

impl fmt::Display for MarkerFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.marker)
    }
}

/// All fatal outcomes of a protocol run.
///
/// A clean no-op is not an error; see [`syncpush_core::SyncOutcome::no_op`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad or missing input; raised before any mutation.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Rebasing onto upstream conflicts with committed history. Needs a human.
    #[error(
        "rebase onto {upstream} conflicts with committed history in: {}; resolve manually",
        display_paths(.paths)
    )]
    SyncConflict { upstream: String, paths: Vec<PathBuf> },

    /// Staged content still carries conflict markers.
    #[error(
        "refusing to commit: conflict markers found in staged content ({})",
        .findings.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    CorruptionGuard { findings: Vec<MarkerFinding> },

    /// Every push attempt lost the race to a concurrent writer.
    #[error("push to {upstream} still rejected after {attempts} attempt(s); retry budget exhausted")]
    PushRaceExhausted { upstream: String, attempts: u32 },

    #[error("VCS error: {0}")]
    Vcs(#[from] VcsError),
}

impl EngineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Validation(_) => exit_codes::VALIDATION,
            EngineError::SyncConflict { .. } => exit_codes::SYNC_CONFLICT,
            EngineError::CorruptionGuard { .. } => exit_codes::CORRUPTION_GUARD,
            EngineError::PushRaceExhausted { .. } => exit_codes::PUSH_RACE_EXHAUSTED,
            EngineError::Vcs(_) => exit_codes::VCS_FAILURE,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
