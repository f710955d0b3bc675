//! syncpush: sync a working tree with its upstream, commit, and push with a
//! bounded retry.
//!
//! # Usage
//!
//! ```text
//! syncpush --commit-message <MSG> [--path <DIR>] [--file-pattern <PATTERNS>]
//!          [--commit-user-name <NAME>] [--commit-user-email <EMAIL>]
//!          [--max-retries <N>] [--remote <NAME>] [--retry-delay <MS>]
//!          [--conflict-strategy local|upstream] [--config <FILE>] [--json] [-v|-q]
//! ```

mod inputs;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use inputs::InputArgs;
use syncpush_core::{config, ConfigError, RawInputs, SyncConfig, SyncOutcome, ValidationError};
use syncpush_engine::{exit_codes, for_strategy, EngineError};
use syncpush_vcs::GitCli;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "syncpush",
    version,
    about = "Rebase local changes onto upstream, commit them, and push with bounded retry",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    inputs: InputArgs,

    /// YAML file supplying defaults for any input not given as a flag.
    #[arg(long, env = "INPUT_CONFIG")]
    config: Option<PathBuf>,

    /// Print the outcome as JSON and log in JSON.
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level(), cli.json);

    let json = cli.json;
    let result = run(cli);
    let summary = match &result {
        Ok(outcome) => report::step_summary(Ok(outcome)),
        Err(err) => {
            let message = format!("{err:#}");
            report::step_summary(Err(message.as_str()))
        }
    };
    if let Err(e) = publish_to_actions(result.as_ref().ok(), &summary) {
        let detail = format!("{e:#}");
        tracing::error!(error = %detail, "failed to write GitHub Actions files");
        if result.is_ok() {
            return ExitCode::from(exit_codes::VCS_FAILURE);
        }
    }

    match result {
        Ok(outcome) => {
            let printed = if json {
                report::print_json(&outcome)
            } else {
                report::print_human(&outcome);
                Ok(())
            };
            match printed {
                Ok(()) => ExitCode::from(exit_codes::SUCCESS),
                Err(e) => {
                    eprintln!("Error: {e:#}");
                    ExitCode::from(exit_codes::VCS_FAILURE)
                }
            }
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<SyncOutcome> {
    let from_file = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => RawInputs::default(),
    };
    let raw = RawInputs::from(cli.inputs).or(from_file);
    let config = SyncConfig::from_inputs(raw).map_err(EngineError::from)?;

    let git = GitCli::open(&config.path)
        .map_err(EngineError::from)?
        .with_committer(config.identity.clone());
    let resolver = for_strategy(config.conflict_strategy);
    let outcome = syncpush_engine::run(&git, &config, resolver.as_ref())?;
    Ok(outcome)
}

fn load_config_file(path: &Path) -> Result<RawInputs> {
    let raw = config::load_at(path)
        .with_context(|| format!("failed to load config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded inputs from config file");
    Ok(raw)
}

/// Append outputs and the step summary when running under GitHub Actions.
/// A failed run reports `committed=false`.
fn publish_to_actions(outcome: Option<&SyncOutcome>, summary: &str) -> Result<()> {
    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
        report::append(Path::new(&path), &report::output_lines(outcome))?;
    }
    if let Some(path) = std::env::var_os("GITHUB_STEP_SUMMARY") {
        report::append(Path::new(&path), summary)?;
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(engine) = err.downcast_ref::<EngineError>() {
        return engine.exit_code();
    }
    if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<ValidationError>().is_some()
    {
        return exit_codes::VALIDATION;
    }
    exit_codes::VCS_FAILURE
}

fn init_tracing(default_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_into_raw_inputs() {
        let cli = Cli::try_parse_from([
            "syncpush",
            "--commit-message",
            "chore: regenerate",
            "--file-pattern",
            "dist docs",
            "--max-retries",
            "5",
        ])
        .unwrap();
        let raw = RawInputs::from(cli.inputs);
        assert_eq!(raw.commit_message.as_deref(), Some("chore: regenerate"));
        assert_eq!(raw.file_pattern.as_deref(), Some("dist docs"));
        assert_eq!(raw.max_retries.as_deref(), Some("5"));
        assert_eq!(raw.remote, None);
    }

    #[test]
    fn flags_win_over_config_file() {
        let cli = Cli::try_parse_from(["syncpush", "-m", "from flag"]).unwrap();
        let file = RawInputs {
            commit_message: Some("from file".into()),
            remote: Some("upstream".into()),
            ..RawInputs::default()
        };
        let raw = RawInputs::from(cli.inputs).or(file);
        assert_eq!(raw.commit_message.as_deref(), Some("from flag"));
        assert_eq!(raw.remote.as_deref(), Some("upstream"));
    }

    #[test]
    fn verbosity_maps_to_filter_level() {
        let quiet = Cli::try_parse_from(["syncpush", "-q"]).unwrap();
        assert_eq!(quiet.log_level(), "error");
        let loud = Cli::try_parse_from(["syncpush", "-vv"]).unwrap();
        assert_eq!(loud.log_level(), "trace");
        assert!(Cli::try_parse_from(["syncpush", "-v", "-q"]).is_err());
    }

    #[test]
    fn error_classes_map_to_exit_codes() {
        let validation = anyhow::Error::from(EngineError::from(ValidationError::EmptyCommitMessage));
        assert_eq!(exit_code(&validation), exit_codes::VALIDATION);

        let exhausted = anyhow::Error::from(EngineError::PushRaceExhausted {
            upstream: "origin/main".into(),
            attempts: 3,
        });
        assert_eq!(exit_code(&exhausted), exit_codes::PUSH_RACE_EXHAUSTED);

        let config = anyhow::Error::from(ConfigError::NotFound {
            path: PathBuf::from("missing.yml"),
        })
        .context("failed to load config file missing.yml");
        assert_eq!(exit_code(&config), exit_codes::VALIDATION);

        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), exit_codes::VCS_FAILURE);
    }
}
