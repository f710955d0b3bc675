//! Parsers for machine-readable `git` output.

use std::path::PathBuf;

use crate::backend::{StagedFile, StashInfo};

/// Split `-z` output into non-empty NUL-terminated fields.
pub fn split_nul(raw: &[u8]) -> Vec<String> {
    raw.split(|b| *b == 0)
        .filter(|field| !field.is_empty())
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Paths from `--name-only -z` output.
pub fn parse_paths_z(raw: &[u8]) -> Vec<PathBuf> {
    split_nul(raw).into_iter().map(PathBuf::from).collect()
}

/// `git diff --cached --name-status --no-renames -z`: alternating status and
/// path fields.
pub fn parse_name_status_z(raw: &[u8]) -> Vec<StagedFile> {
    let fields = split_nul(raw);
    fields
        .chunks(2)
        .filter_map(|pair| match pair {
            [status, path] => Some(StagedFile {
                path: PathBuf::from(path),
                deleted: status.starts_with('D'),
            }),
            _ => None,
        })
        .collect()
}

/// `git stash list --format=%gd%x00%gs`, one entry per line.
///
/// The subject of a `stash push -m <msg>` entry is `On <branch>: <msg>`; the
/// prefix is stripped so callers see the message they saved.
pub fn parse_stash_list(raw: &str) -> Vec<StashInfo> {
    raw.lines()
        .filter_map(|line| {
            let (reference, subject) = line.split_once('\0')?;
            let message = subject
                .split_once(": ")
                .filter(|(prefix, _)| prefix.starts_with("On ") || prefix.starts_with("WIP on "))
                .map(|(_, rest)| rest)
                .unwrap_or(subject);
            Some(StashInfo {
                reference: reference.trim().to_string(),
                message: message.to_string(),
            })
        })
        .collect()
}

/// Classification of one ref line from `git push --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushLine {
    /// `' '`, `'+'`, `'-'`, `'*'` or `'='`: the ref is where we wanted it.
    Ok,
    /// `!` with `[rejected]`: non-fast-forward or fetch-first.
    Stale,
    /// `!` with anything else, e.g. `[remote rejected] (pre-receive hook declined)`.
    Refused(String),
}

/// Find the status of the pushed ref in `git push --porcelain` stdout.
///
/// Ref lines look like `<flag>\t<from>:<to>\t<summary>`; `To <url>` and
/// `Done` lines are ignored.
pub fn parse_push_porcelain(stdout: &str) -> Option<PushLine> {
    stdout.lines().find_map(|line| {
        let mut parts = line.splitn(3, '\t');
        let flag = parts.next()?;
        let _refs = parts.next()?;
        let summary = parts.next().unwrap_or("").trim();
        match flag {
            "!" if summary.starts_with("[rejected]") => Some(PushLine::Stale),
            "!" => Some(PushLine::Refused(summary.to_string())),
            " " | "+" | "-" | "*" | "=" => Some(PushLine::Ok),
            _ => None,
        }
    })
}

/// Whether stderr from a failed push without porcelain ref lines still reads
/// as a lost race.
pub fn stderr_is_stale_push(stderr: &str) -> bool {
    stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("[rejected]")
        || stderr.contains("stale info")
}
