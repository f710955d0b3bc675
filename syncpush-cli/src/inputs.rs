//! Protocol inputs as command-line flags.
//!
//! Every flag also reads the GitHub Actions variable `INPUT_<NAME>`, so the
//! binary can run as an action step without a wrapper script.

use clap::Args;
use syncpush_core::RawInputs;

#[derive(Args, Debug, Default, Clone)]
pub struct InputArgs {
    /// Working tree to sync [default: .]
    #[arg(long, env = "INPUT_PATH")]
    pub path: Option<String>,

    /// Message for the commit, if one is made.
    #[arg(short = 'm', long, env = "INPUT_COMMIT_MESSAGE")]
    pub commit_message: Option<String>,

    /// Whitespace-separated pathspecs to stage [default: .]
    #[arg(long, env = "INPUT_FILE_PATTERN")]
    pub file_pattern: Option<String>,

    /// Author and committer name [default: github-actions[bot]]
    #[arg(long, env = "INPUT_COMMIT_USER_NAME")]
    pub commit_user_name: Option<String>,

    /// Author and committer email.
    #[arg(long, env = "INPUT_COMMIT_USER_EMAIL")]
    pub commit_user_email: Option<String>,

    /// Total push attempts before giving up [default: 3]
    #[arg(long, env = "INPUT_MAX_RETRIES")]
    pub max_retries: Option<String>,

    /// Remote to fetch from and push to [default: origin]
    #[arg(long, env = "INPUT_REMOTE")]
    pub remote: Option<String>,

    /// Base backoff between push attempts, in milliseconds [default: 1000]
    #[arg(long, env = "INPUT_RETRY_DELAY")]
    pub retry_delay: Option<String>,

    /// Winner when restoring local changes conflicts: local or upstream
    /// [default: local]
    #[arg(long, env = "INPUT_CONFLICT_STRATEGY")]
    pub conflict_strategy: Option<String>,
}

impl From<InputArgs> for RawInputs {
    fn from(args: InputArgs) -> Self {
        RawInputs {
            path: args.path,
            commit_message: args.commit_message,
            file_pattern: args.file_pattern,
            commit_user_name: args.commit_user_name,
            commit_user_email: args.commit_user_email,
            max_retries: args.max_retries,
            remote: args.remote,
            retry_delay: args.retry_delay,
            conflict_strategy: args.conflict_strategy,
        }
    }
}
