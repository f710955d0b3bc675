//! Rendering a run's result: terminal summary, JSON, and the GitHub Actions
//! output and step-summary files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use syncpush_core::SyncOutcome;

pub fn print_human(outcome: &SyncOutcome) {
    if !outcome.committed {
        println!(
            "{} nothing to commit on '{}'; already in sync",
            "✓".green(),
            outcome.branch
        );
        return;
    }

    let sha = outcome.commit_sha.as_ref().map(|s| s.short()).unwrap_or("");
    println!(
        "{} pushed {} to '{}' ({} attempt{})",
        "✓".green(),
        sha.bold(),
        outcome.branch,
        outcome.attempts,
        if outcome.attempts == 1 { "" } else { "s" }
    );
    println!("  author: {}", outcome.author);
    for file in &outcome.files {
        println!("  ✎  {}", file.display());
    }
}

pub fn print_json(outcome: &SyncOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("failed to serialize outcome")?;
    println!("{json}");
    Ok(())
}

/// `key=value` lines for `$GITHUB_OUTPUT`. `None` is a failed run, which
/// never leaves a commit behind.
pub fn output_lines(outcome: Option<&SyncOutcome>) -> String {
    match outcome {
        Some(outcome) => format!(
            "committed={}\ncommit_sha={}\n",
            outcome.committed,
            outcome.commit_sha_output()
        ),
        None => "committed=false\ncommit_sha=\n".to_string(),
    }
}

/// Markdown block for `$GITHUB_STEP_SUMMARY`.
pub fn step_summary(result: Result<&SyncOutcome, &str>) -> String {
    let mut md = String::from("### syncpush\n\n");
    match result {
        Ok(outcome) if outcome.committed => {
            md.push_str(&format!(
                "✅ Committed `{}` to `{}` after {} push attempt(s).\n\n",
                outcome.commit_sha_output(),
                outcome.branch,
                outcome.attempts
            ));
            md.push_str(&format!("Author: {}\n\n", outcome.author));
            for file in &outcome.files {
                md.push_str(&format!("- `{}`\n", file.display()));
            }
        }
        Ok(outcome) => {
            md.push_str(&format!(
                "✅ No changes to commit on `{}`.\n",
                outcome.branch
            ));
        }
        Err(message) => {
            md.push_str(&format!("❌ Failed: {message}\n"));
        }
    }
    md
}

/// Append `text` to `path`, creating it if needed.
pub fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}
