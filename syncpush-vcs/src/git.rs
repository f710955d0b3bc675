//! [`VcsBackend`] implemented by driving the `git` binary.
//!
//! Commands run from the repository root so that every path git prints and
//! every path we hand back to it share one base. Staging is the exception: it
//! runs from the configured directory so caller patterns resolve relative to
//! it.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use syncpush_core::{BranchName, CommitSha, Identity, Side};

use crate::backend::{
    PushOutcome, RebaseOutcome, StageResult, StagedFile, StashInfo, StashPop, VcsBackend,
};
use crate::error::{io_err, VcsError};
use crate::porcelain::{self, PushLine};

/// Handle onto one working tree, driven through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    root: PathBuf,
    committer: Option<Identity>,
}

impl GitCli {
    /// Build a handle for `workdir` without touching git; the repository root
    /// is assumed to be `workdir` itself.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            root: workdir.clone(),
            workdir,
            committer: None,
        }
    }

    /// Resolve the repository root for `workdir`.
    ///
    /// Outside a work tree the root stays at `workdir` and
    /// [`VcsBackend::is_work_tree`] reports `false`.
    pub fn open(workdir: impl Into<PathBuf>) -> Result<Self, VcsError> {
        let mut git = Self::new(workdir);
        let (output, _) = git.run(["rev-parse", "--show-toplevel"])?;
        if output.status.success() {
            let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !top.is_empty() {
                git.root = PathBuf::from(top);
            }
        }
        Ok(git)
    }

    /// Identity recorded as committer on every commit git writes, including
    /// commits rewritten by a rebase.
    pub fn with_committer(mut self, identity: Identity) -> Self {
        self.committer = Some(identity);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    // -----------------------------------------------------------------------
    // Process plumbing
    // -----------------------------------------------------------------------

    fn command_in<I, S>(&self, cwd: &Path, args: I) -> (Command, String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("git");
        let mut rendered = Vec::new();
        for arg in args {
            rendered.push(arg.as_ref().to_string_lossy().into_owned());
            cmd.arg(arg.as_ref());
        }
        cmd.current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");
        // Stash entries are commits too; give them an author as well.
        if let Some(id) = &self.committer {
            cmd.env("GIT_AUTHOR_NAME", &id.name)
                .env("GIT_AUTHOR_EMAIL", &id.email)
                .env("GIT_COMMITTER_NAME", &id.name)
                .env("GIT_COMMITTER_EMAIL", &id.email);
        }
        (cmd, rendered.join(" "))
    }

    fn exec(&self, mut cmd: Command, args: &str, cwd: &Path) -> Result<Output, VcsError> {
        tracing::debug!(%args, "running git");
        cmd.output().map_err(|source| VcsError::Spawn {
            args: args.to_string(),
            cwd: cwd.to_path_buf(),
            source,
        })
    }

    /// Run in the repository root and return the raw output, whatever the
    /// exit status.
    fn run<I, S>(&self, args: I) -> Result<(Output, String), VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (cmd, rendered) = self.command_in(&self.root, args);
        let output = self.exec(cmd, &rendered, &self.root)?;
        Ok((output, rendered))
    }

    /// Run in the repository root; non-zero exit is an error. Returns stdout.
    fn run_ok<I, S>(&self, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (output, rendered) = self.run(args)?;
        check(&output, &rendered)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_ok_bytes<I, S>(&self, args: I) -> Result<Vec<u8>, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (output, rendered) = self.run(args)?;
        check(&output, &rendered)?;
        Ok(output.stdout)
    }

    fn git_path_exists(&self, name: &str) -> Result<bool, VcsError> {
        let raw = self.run_ok(["rev-parse", "--git-path", name])?;
        let path = PathBuf::from(raw.trim());
        let path = if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        };
        Ok(path.exists())
    }
}

fn check(output: &Output, args: &str) -> Result<(), VcsError> {
    if output.status.success() {
        return Ok(());
    }
    Err(command_error(output, args))
}

fn command_error(output: &Output, args: &str) -> VcsError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    VcsError::Command {
        args: args.to_string(),
        status: output.status.to_string(),
        stderr: if stderr.is_empty() { stdout } else { stderr },
    }
}

// ---------------------------------------------------------------------------
// VcsBackend
// ---------------------------------------------------------------------------

impl VcsBackend for GitCli {
    fn is_work_tree(&self) -> Result<bool, VcsError> {
        let (cmd, rendered) =
            self.command_in(&self.workdir, ["rev-parse", "--is-inside-work-tree"]);
        let output = self.exec(cmd, &rendered, &self.workdir)?;
        Ok(output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    fn current_branch(&self) -> Result<Option<BranchName>, VcsError> {
        let (output, _) = self.run(["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!branch.is_empty()).then(|| BranchName(branch)))
    }

    fn rebase_in_progress(&self) -> Result<bool, VcsError> {
        Ok(self.git_path_exists("rebase-merge")? || self.git_path_exists("rebase-apply")?)
    }

    fn unmerged_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        let raw = self.run_ok_bytes(["diff", "--name-only", "--diff-filter=U", "-z"])?;
        let mut paths = porcelain::parse_paths_z(&raw);
        paths.dedup();
        Ok(paths)
    }

    fn is_dirty(&self) -> Result<bool, VcsError> {
        let raw = self.run_ok_bytes(["status", "--porcelain=v1", "-z", "--untracked-files=all"])?;
        Ok(!raw.is_empty())
    }

    fn head(&self) -> Result<CommitSha, VcsError> {
        let sha = self.run_ok(["rev-parse", "HEAD"])?;
        Ok(CommitSha(sha.trim().to_string()))
    }

    fn stash_list(&self) -> Result<Vec<StashInfo>, VcsError> {
        let raw = self.run_ok(["stash", "list", "--format=%gd%x00%gs"])?;
        Ok(porcelain::parse_stash_list(&raw))
    }

    fn stash_save(&self, message: &str) -> Result<bool, VcsError> {
        let before = self.stash_list()?.len();
        self.run_ok(["stash", "push", "--include-untracked", "--message", message])?;
        Ok(self.stash_list()?.len() > before)
    }

    fn stash_pop(&self) -> Result<StashPop, VcsError> {
        let (output, rendered) = self.run(["stash", "pop"])?;
        if output.status.success() {
            return Ok(StashPop::Applied);
        }
        let conflicted = self.unmerged_paths()?;
        if conflicted.is_empty() {
            // git keeps the entry when it refuses to apply it.
            return Err(command_error(&output, &rendered));
        }
        Ok(StashPop::Conflicted(conflicted))
    }

    fn stash_untracked_collisions(&self) -> Result<Vec<PathBuf>, VcsError> {
        // The third parent only exists when untracked files were saved.
        let (output, _) = self.run(["rev-parse", "--verify", "--quiet", "stash@{0}^3"])?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let raw = self.run_ok_bytes(["ls-tree", "-r", "--name-only", "-z", "stash@{0}^3"])?;
        Ok(porcelain::parse_paths_z(&raw)
            .into_iter()
            .filter(|p| self.root.join(p).symlink_metadata().is_ok())
            .collect())
    }

    fn stash_archive(&self, reference: &str) -> Result<(), VcsError> {
        self.run_ok(["update-ref", reference, "stash@{0}"])?;
        self.stash_drop()
    }

    fn take_side(&self, path: &Path, side: Side) -> Result<(), VcsError> {
        // While a stash is being applied, "ours" is HEAD and "theirs" is the stash.
        let flag = match side {
            Side::Local => "--theirs",
            Side::Upstream => "--ours",
        };
        let args = [
            OsStr::new("checkout"),
            OsStr::new(flag),
            OsStr::new("--"),
            path.as_os_str(),
        ];
        let (output, rendered) = self.run(args)?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not have") {
            // The winning side deleted the file.
            let full = self.root.join(path);
            if full.exists() {
                std::fs::remove_file(&full).map_err(|e| io_err(&full, e))?;
            }
            return Ok(());
        }
        Err(command_error(&output, &rendered))
    }

    fn reset_index(&self) -> Result<(), VcsError> {
        self.run_ok(["reset", "--quiet"])?;
        Ok(())
    }

    fn stash_drop(&self) -> Result<(), VcsError> {
        self.run_ok(["stash", "drop", "--quiet"])?;
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<(), VcsError> {
        let full = self.root.join(path);
        std::fs::remove_file(&full).map_err(|e| io_err(&full, e))
    }

    fn checkout_head(&self, path: &Path) -> Result<(), VcsError> {
        let args = [
            OsStr::new("checkout"),
            OsStr::new("HEAD"),
            OsStr::new("--"),
            path.as_os_str(),
        ];
        self.run_ok(args)?;
        Ok(())
    }

    fn fetch(&self, remote: &str, branch: &BranchName) -> Result<(), VcsError> {
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.run_ok(["fetch", "--quiet", remote, refspec.as_str()])?;
        Ok(())
    }

    fn rebase(&self, remote: &str, branch: &BranchName) -> Result<RebaseOutcome, VcsError> {
        let upstream = format!("{remote}/{branch}");
        let (output, rendered) = self.run(["rebase", "--quiet", upstream.as_str()])?;
        if output.status.success() {
            return Ok(RebaseOutcome::Rebased);
        }

        let conflicted = self.unmerged_paths()?;
        if self.rebase_in_progress()? {
            self.run_ok(["rebase", "--abort"])?;
        }
        if conflicted.is_empty() {
            return Err(command_error(&output, &rendered));
        }
        Ok(RebaseOutcome::Conflict(conflicted))
    }

    fn stage(&self, pattern: &str) -> Result<StageResult, VcsError> {
        let (cmd, rendered) = self.command_in(&self.workdir, ["add", "--all", "--", pattern]);
        let output = self.exec(cmd, &rendered, &self.workdir)?;
        if output.status.success() {
            return Ok(StageResult::Staged);
        }
        if String::from_utf8_lossy(&output.stderr).contains("did not match any files") {
            return Ok(StageResult::NoMatch);
        }
        Err(command_error(&output, &rendered))
    }

    fn staged_changes(&self) -> Result<Vec<StagedFile>, VcsError> {
        let raw = self.run_ok_bytes(["diff", "--cached", "--name-status", "--no-renames", "-z"])?;
        Ok(porcelain::parse_name_status_z(&raw))
    }

    fn read_staged(&self, path: &Path) -> Result<Vec<u8>, VcsError> {
        let spec = format!(":{}", path.to_string_lossy());
        self.run_ok_bytes(["cat-file", "blob", spec.as_str()])
    }

    fn commit(&self, author: &Identity, message: &str) -> Result<CommitSha, VcsError> {
        let (mut cmd, rendered) =
            self.command_in(&self.root, ["commit", "--quiet", "--message", message]);
        cmd.env("GIT_AUTHOR_NAME", &author.name)
            .env("GIT_AUTHOR_EMAIL", &author.email);
        if self.committer.is_none() {
            cmd.env("GIT_COMMITTER_NAME", &author.name)
                .env("GIT_COMMITTER_EMAIL", &author.email);
        }
        let output = self.exec(cmd, &rendered, &self.root)?;
        check(&output, &rendered)?;
        self.head()
    }

    fn uncommit_head(&self) -> Result<(), VcsError> {
        self.run_ok(["reset", "--mixed", "--quiet", "HEAD~1"])?;
        Ok(())
    }

    fn push(&self, remote: &str, branch: &BranchName) -> Result<PushOutcome, VcsError> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        let (output, rendered) = self.run(["push", "--porcelain", remote, refspec.as_str()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        match porcelain::parse_push_porcelain(&stdout) {
            Some(PushLine::Ok) if output.status.success() => Ok(PushOutcome::Pushed),
            Some(PushLine::Stale) => Ok(PushOutcome::Rejected),
            Some(PushLine::Refused(reason)) => Err(VcsError::PushRefused { reason }),
            _ if output.status.success() => Err(VcsError::Parse {
                args: rendered,
                detail: format!("no ref status line in: {}", stdout.trim()),
            }),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if porcelain::stderr_is_stale_push(&stderr) {
                    Ok(PushOutcome::Rejected)
                } else {
                    Err(command_error(&output, &rendered))
                }
            }
        }
    }
}
