//! Staging by pathspec and the conflict-marker guard.

use std::path::PathBuf;

use syncpush_vcs::{StageResult, VcsBackend};

use crate::error::{EngineError, MarkerFinding};

const MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

/// Bytes inspected when deciding whether a blob is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// Paths staged for the next commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedChangeSet {
    pub files: Vec<PathBuf>,
}

impl StagedChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Stage every pattern with add-all semantics and return the index-vs-HEAD
/// diff. A pattern that matches nothing is skipped.
pub fn stage_patterns<B>(vcs: &B, patterns: &[String]) -> Result<StagedChangeSet, EngineError>
where
    B: VcsBackend + ?Sized,
{
    for pattern in patterns {
        match vcs.stage(pattern)? {
            StageResult::Staged => tracing::debug!(%pattern, "staged pathspec"),
            StageResult::NoMatch => {
                tracing::warn!(%pattern, "file pattern matched no files; skipping")
            }
        }
    }
    let files = vcs
        .staged_changes()?
        .into_iter()
        .map(|f| f.path)
        .collect();
    Ok(StagedChangeSet { files })
}

/// Line-anchored scan for conflict markers as git writes them. Binary
/// content yields nothing.
///
/// Returns `(line, marker)` pairs with 1-based line numbers.
pub fn scan_markers(content: &[u8]) -> Vec<(usize, &'static str)> {
    let sniff = &content[..content.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Vec::new();
    }
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            MARKERS
                .iter()
                .find(|m| is_marker_line(line, m.as_bytes()))
                .map(|m| (idx + 1, *m))
        })
        .collect()
}

/// `<<<<<<<` and `>>>>>>>` may carry a label after a space; the separator
/// stands alone.
fn is_marker_line(line: &[u8], marker: &[u8]) -> bool {
    let Some(rest) = line.strip_prefix(marker) else {
        return false;
    };
    if marker[0] == b'=' {
        rest.is_empty()
    } else {
        rest.is_empty() || rest[0] == b' '
    }
}

/// Refuse to proceed if any staged, non-deleted file carries a marker.
///
/// On a hit the index is reset so nothing stays staged, and
/// [`EngineError::CorruptionGuard`] lists every finding.
pub fn check_markers<B>(vcs: &B) -> Result<(), EngineError>
where
    B: VcsBackend + ?Sized,
{
    let mut findings = Vec::new();
    for file in vcs.staged_changes()? {
        if file.deleted {
            continue;
        }
        let content = vcs.read_staged(&file.path)?;
        for (line, marker) in scan_markers(&content) {
            findings.push(MarkerFinding {
                path: file.path.clone(),
                line,
                marker,
            });
        }
    }

    if findings.is_empty() {
        return Ok(());
    }
    for finding in &findings {
        tracing::error!(%finding, "conflict marker in staged content");
    }
    vcs.reset_index()?;
    Err(EngineError::CorruptionGuard { findings })
}
