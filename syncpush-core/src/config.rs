//! Caller-supplied configuration.
//!
//! Inputs arrive as raw strings (CLI flags, `INPUT_*` environment variables,
//! or an optional YAML file) and are only turned into typed values by
//! [`SyncConfig::from_inputs`], so that every malformed value is reported with
//! the name of the input it came from.
//!
//! # Precedence
//!
//! ```text
//! flag / env  >  YAML file  >  built-in default
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::types::{ConflictStrategy, Identity, DEFAULT_USER_EMAIL, DEFAULT_USER_NAME};

pub const DEFAULT_PATH: &str = ".";
pub const DEFAULT_FILE_PATTERN: &str = ".";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Raw inputs
// ---------------------------------------------------------------------------

/// Unvalidated inputs. `None` means "not supplied at this layer".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawInputs {
    pub path: Option<String>,
    pub commit_message: Option<String>,
    pub file_pattern: Option<String>,
    pub commit_user_name: Option<String>,
    pub commit_user_email: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub max_retries: Option<String>,
    pub remote: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub retry_delay: Option<String>,
    pub conflict_strategy: Option<String>,
}

impl RawInputs {
    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: RawInputs) -> RawInputs {
        RawInputs {
            path: self.path.or(fallback.path),
            commit_message: self.commit_message.or(fallback.commit_message),
            file_pattern: self.file_pattern.or(fallback.file_pattern),
            commit_user_name: self.commit_user_name.or(fallback.commit_user_name),
            commit_user_email: self.commit_user_email.or(fallback.commit_user_email),
            max_retries: self.max_retries.or(fallback.max_retries),
            remote: self.remote.or(fallback.remote),
            retry_delay: self.retry_delay.or(fallback.retry_delay),
            conflict_strategy: self.conflict_strategy.or(fallback.conflict_strategy),
        }
    }
}

/// Accept YAML integers as well as strings for numeric inputs.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Str(String),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| match s {
        Scalar::Int(n) => n.to_string(),
        Scalar::Str(s) => s,
    }))
}

/// Load a YAML config file.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed.
pub fn load_at(path: &Path) -> Result<RawInputs, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(RawInputs::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Validated config
// ---------------------------------------------------------------------------

/// Typed, validated configuration for one protocol run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub path: PathBuf,
    pub commit_message: String,
    /// Git pathspecs; never empty.
    pub file_patterns: Vec<String>,
    pub identity: Identity,
    pub max_retries: u32,
    pub remote: String,
    pub retry_delay: Duration,
    pub conflict_strategy: ConflictStrategy,
}

impl SyncConfig {
    /// Validate raw inputs, applying defaults for anything unset.
    ///
    /// Only the filesystem checks happen here; whether `path` is a working
    /// tree is the engine's preflight concern.
    pub fn from_inputs(raw: RawInputs) -> Result<SyncConfig, ValidationError> {
        let path = PathBuf::from(non_blank(raw.path).unwrap_or_else(|| DEFAULT_PATH.to_string()));
        if !path.exists() {
            return Err(ValidationError::PathMissing { path });
        }
        if !path.is_dir() {
            return Err(ValidationError::NotADirectory { path });
        }

        let commit_message = raw
            .commit_message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ValidationError::EmptyCommitMessage)?;

        let file_patterns = parse_file_patterns(raw.file_pattern.as_deref());
        let identity = Identity {
            name: required_or_default(raw.commit_user_name, "commit_user_name", DEFAULT_USER_NAME)?,
            email: required_or_default(
                raw.commit_user_email,
                "commit_user_email",
                DEFAULT_USER_EMAIL,
            )?,
        };

        let max_retries = match raw.max_retries {
            None => DEFAULT_MAX_RETRIES,
            Some(value) => parse_max_retries(&value)?,
        };

        let remote = required_or_default(raw.remote, "remote", DEFAULT_REMOTE)?;

        let retry_delay = match raw.retry_delay {
            None => Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ValidationError::InvalidRetryDelay { value })?,
        };

        let conflict_strategy = match raw.conflict_strategy {
            None => ConflictStrategy::default(),
            Some(value) => parse_strategy(&value)?,
        };

        Ok(SyncConfig {
            path,
            commit_message,
            file_patterns,
            identity,
            max_retries,
            remote,
            retry_delay,
            conflict_strategy,
        })
    }
}

/// `max_retries` must parse as an integer greater than zero.
pub fn parse_max_retries(value: &str) -> Result<u32, ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::InvalidMaxRetries {
            value: value.to_string(),
        }),
    }
}

/// Split a whitespace-separated pattern list; blank input means the default.
pub fn parse_file_patterns(value: Option<&str>) -> Vec<String> {
    let patterns: Vec<String> = value
        .unwrap_or(DEFAULT_FILE_PATTERN)
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if patterns.is_empty() {
        vec![DEFAULT_FILE_PATTERN.to_string()]
    } else {
        patterns
    }
}

fn parse_strategy(value: &str) -> Result<ConflictStrategy, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(ConflictStrategy::Local),
        "upstream" => Ok(ConflictStrategy::Upstream),
        _ => Err(ValidationError::UnknownStrategy {
            value: value.to_string(),
        }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Unset falls back to `default`; explicitly supplied but blank is an error.
fn required_or_default(
    value: Option<String>,
    input: &'static str,
    default: &str,
) -> Result<String, ValidationError> {
    match value {
        None => Ok(default.to_string()),
        Some(v) if v.trim().is_empty() => Err(ValidationError::EmptyInput { input }),
        Some(v) => Ok(v.trim().to_string()),
    }
}
