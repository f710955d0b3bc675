//! Scripted in-memory [`VcsBackend`] for protocol tests.
//!
//! Each method records a call name; outcomes for stash pops, rebases and
//! pushes are taken from queues (falling back to the happy path once a queue
//! is empty).

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use syncpush_core::{BranchName, CommitSha, Identity, Side};
use syncpush_vcs::{
    PushOutcome, RebaseOutcome, StageResult, StagedFile, StashInfo, StashPop, VcsBackend,
    VcsError,
};

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub work_tree: bool,
    pub branch: Option<BranchName>,
    pub rebase_in_progress: bool,
    pub unmerged: Vec<PathBuf>,
    pub dirty: bool,
    /// Files outside the staged patterns that stay modified after a commit.
    pub leftover_dirty: bool,
    pub stashes: Vec<String>,
    pub pops: VecDeque<StashPop>,
    /// Makes the next `stash_pop` fail, leaving the entry in place.
    pub pop_error: Option<String>,
    /// Untracked stash paths that block the next pop.
    pub collisions: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub head_checkouts: Vec<PathBuf>,
    pub archived: Vec<(String, String)>,
    pub rebases: VecDeque<RebaseOutcome>,
    pub pushes: VecDeque<PushOutcome>,
    pub fetch_error: Option<String>,
    /// Files that become staged on the first `stage` call.
    pub stageable: Vec<StagedFile>,
    pub no_match: HashSet<String>,
    pub staged: Vec<StagedFile>,
    pub contents: HashMap<PathBuf, Vec<u8>>,
    pub head: u32,
    pub commits: Vec<(Identity, String)>,
    pub sides: Vec<(PathBuf, Side)>,
    pub calls: Vec<&'static str>,
}

#[derive(Debug)]
pub(crate) struct FakeVcs {
    pub state: RefCell<FakeState>,
}

impl FakeVcs {
    /// Clean work tree on `main` with nothing to commit.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(FakeState {
                work_tree: true,
                branch: Some(BranchName::from("main")),
                ..FakeState::default()
            }),
        }
    }

    /// Work tree with one modified file that staging will pick up.
    pub fn with_change(path: &str, content: &str) -> Self {
        let fake = Self::new();
        fake.add_change(path, content);
        fake.state.borrow_mut().dirty = true;
        fake
    }

    pub fn add_change(&self, path: &str, content: &str) {
        let mut st = self.state.borrow_mut();
        st.stageable.push(StagedFile {
            path: PathBuf::from(path),
            deleted: false,
        });
        st.contents
            .insert(PathBuf::from(path), content.as_bytes().to_vec());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state.borrow().calls.iter().filter(|c| **c == name).count()
    }

    fn record(&self, name: &'static str) {
        self.state.borrow_mut().calls.push(name);
    }

    fn sha(n: u32) -> CommitSha {
        CommitSha(format!("{n:040x}"))
    }
}

impl VcsBackend for FakeVcs {
    fn is_work_tree(&self) -> Result<bool, VcsError> {
        self.record("is_work_tree");
        Ok(self.state.borrow().work_tree)
    }

    fn current_branch(&self) -> Result<Option<BranchName>, VcsError> {
        self.record("current_branch");
        Ok(self.state.borrow().branch.clone())
    }

    fn rebase_in_progress(&self) -> Result<bool, VcsError> {
        self.record("rebase_in_progress");
        Ok(self.state.borrow().rebase_in_progress)
    }

    fn unmerged_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        self.record("unmerged_paths");
        Ok(self.state.borrow().unmerged.clone())
    }

    fn is_dirty(&self) -> Result<bool, VcsError> {
        self.record("is_dirty");
        Ok(self.state.borrow().dirty)
    }

    fn head(&self) -> Result<CommitSha, VcsError> {
        Ok(Self::sha(self.state.borrow().head))
    }

    fn stash_list(&self) -> Result<Vec<StashInfo>, VcsError> {
        self.record("stash_list");
        Ok(self
            .state
            .borrow()
            .stashes
            .iter()
            .rev()
            .enumerate()
            .map(|(i, message)| StashInfo {
                reference: format!("stash@{{{i}}}"),
                message: message.clone(),
            })
            .collect())
    }

    fn stash_save(&self, message: &str) -> Result<bool, VcsError> {
        self.record("stash_save");
        let mut st = self.state.borrow_mut();
        if !st.dirty {
            return Ok(false);
        }
        st.stashes.push(message.to_string());
        st.dirty = false;
        Ok(true)
    }

    fn stash_pop(&self) -> Result<StashPop, VcsError> {
        self.record("stash_pop");
        let mut st = self.state.borrow_mut();
        if let Some(stderr) = st.pop_error.take() {
            return Err(VcsError::Command {
                args: "stash pop".into(),
                status: "exit status: 1".into(),
                stderr,
            });
        }
        let outcome = st.pops.pop_front().unwrap_or(StashPop::Applied);
        if outcome == StashPop::Applied {
            st.stashes.pop();
        }
        st.dirty = true;
        Ok(outcome)
    }

    fn stash_untracked_collisions(&self) -> Result<Vec<PathBuf>, VcsError> {
        self.record("stash_untracked_collisions");
        Ok(std::mem::take(&mut self.state.borrow_mut().collisions))
    }

    fn stash_archive(&self, reference: &str) -> Result<(), VcsError> {
        self.record("stash_archive");
        let mut st = self.state.borrow_mut();
        if let Some(message) = st.stashes.pop() {
            st.archived.push((reference.to_string(), message));
        }
        Ok(())
    }

    fn take_side(&self, path: &Path, side: Side) -> Result<(), VcsError> {
        self.record("take_side");
        self.state
            .borrow_mut()
            .sides
            .push((path.to_path_buf(), side));
        Ok(())
    }

    fn reset_index(&self) -> Result<(), VcsError> {
        self.record("reset_index");
        self.state.borrow_mut().staged.clear();
        Ok(())
    }

    fn stash_drop(&self) -> Result<(), VcsError> {
        self.record("stash_drop");
        self.state.borrow_mut().stashes.pop();
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<(), VcsError> {
        self.record("remove_path");
        self.state.borrow_mut().removed.push(path.to_path_buf());
        Ok(())
    }

    fn checkout_head(&self, path: &Path) -> Result<(), VcsError> {
        self.record("checkout_head");
        self.state.borrow_mut().head_checkouts.push(path.to_path_buf());
        Ok(())
    }

    fn fetch(&self, _remote: &str, _branch: &BranchName) -> Result<(), VcsError> {
        self.record("fetch");
        match self.state.borrow().fetch_error.clone() {
            Some(stderr) => Err(VcsError::Command {
                args: "fetch".into(),
                status: "exit status: 128".into(),
                stderr,
            }),
            None => Ok(()),
        }
    }

    fn rebase(&self, _remote: &str, _branch: &BranchName) -> Result<RebaseOutcome, VcsError> {
        self.record("rebase");
        let mut st = self.state.borrow_mut();
        let outcome = st.rebases.pop_front().unwrap_or(RebaseOutcome::Rebased);
        if outcome == RebaseOutcome::Rebased && !st.commits.is_empty() {
            // Replaying our commit onto a new tip gives it a new id.
            st.head += 100;
        }
        Ok(outcome)
    }

    fn stage(&self, pattern: &str) -> Result<StageResult, VcsError> {
        self.record("stage");
        let mut st = self.state.borrow_mut();
        if st.no_match.contains(pattern) {
            return Ok(StageResult::NoMatch);
        }
        let pending = std::mem::take(&mut st.stageable);
        st.staged.extend(pending);
        Ok(StageResult::Staged)
    }

    fn staged_changes(&self) -> Result<Vec<StagedFile>, VcsError> {
        self.record("staged_changes");
        Ok(self.state.borrow().staged.clone())
    }

    fn read_staged(&self, path: &Path) -> Result<Vec<u8>, VcsError> {
        self.record("read_staged");
        Ok(self
            .state
            .borrow()
            .contents
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, author: &Identity, message: &str) -> Result<CommitSha, VcsError> {
        self.record("commit");
        let mut st = self.state.borrow_mut();
        st.commits.push((author.clone(), message.to_string()));
        st.staged.clear();
        st.dirty = st.leftover_dirty;
        st.head += 1;
        Ok(Self::sha(st.head))
    }

    fn uncommit_head(&self) -> Result<(), VcsError> {
        self.record("uncommit_head");
        let mut st = self.state.borrow_mut();
        st.commits.pop();
        st.dirty = true;
        Ok(())
    }

    fn push(&self, _remote: &str, _branch: &BranchName) -> Result<PushOutcome, VcsError> {
        self.record("push");
        Ok(self
            .state
            .borrow_mut()
            .pushes
            .pop_front()
            .unwrap_or(PushOutcome::Pushed))
    }
}
