//! Stash-restore conflict policies.
//!
//! A resolver decides, per conflicted path, which side wins wholesale. There
//! is no hunk-level merge.

use std::path::Path;

use syncpush_core::{ConflictStrategy, Side};

pub trait ConflictResolver {
    fn resolve(&self, path: &Path) -> Side;
}

/// Local (stashed) changes always win. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferLocal;

impl ConflictResolver for PreferLocal {
    fn resolve(&self, _path: &Path) -> Side {
        Side::Local
    }
}

/// Freshly pulled upstream content always wins; local edits to conflicted
/// paths are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferUpstream;

impl ConflictResolver for PreferUpstream {
    fn resolve(&self, _path: &Path) -> Side {
        Side::Upstream
    }
}

impl<F> ConflictResolver for F
where
    F: Fn(&Path) -> Side,
{
    fn resolve(&self, path: &Path) -> Side {
        self(path)
    }
}

/// Resolver for a configured strategy name.
pub fn for_strategy(strategy: ConflictStrategy) -> Box<dyn ConflictResolver> {
    match strategy {
        ConflictStrategy::Local => Box::new(PreferLocal),
        ConflictStrategy::Upstream => Box::new(PreferUpstream),
    }
}
