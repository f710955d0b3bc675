use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const INPUT_VARS: [&str; 10] = [
    "INPUT_PATH",
    "INPUT_COMMIT_MESSAGE",
    "INPUT_FILE_PATTERN",
    "INPUT_COMMIT_USER_NAME",
    "INPUT_COMMIT_USER_EMAIL",
    "INPUT_MAX_RETRIES",
    "INPUT_REMOTE",
    "INPUT_RETRY_DELAY",
    "INPUT_CONFLICT_STRATEGY",
    "INPUT_CONFIG",
];

/// The binary with a scrubbed Actions environment.
fn syncpush() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("syncpush"));
    for var in INPUT_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("GITHUB_OUTPUT")
        .env_remove("GITHUB_STEP_SUMMARY")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "fixture")
        .env("GIT_AUTHOR_EMAIL", "fixture@example.com")
        .env("GIT_COMMITTER_NAME", "fixture")
        .env("GIT_COMMITTER_EMAIL", "fixture@example.com")
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Bare remote with one seeded commit, plus a clone to work in.
fn repo() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let remote = tmp.path().join("remote.git");
    git(tmp.path(), &["init", "--bare", "--quiet", "remote.git"]);
    git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let work = tmp.path().join("work");
    git(tmp.path(), &["clone", "--quiet", "remote.git", "work"]);
    git(&work, &["checkout", "--quiet", "-B", "main"]);
    fs::write(work.join("README.md"), "# demo\n").unwrap();
    git(&work, &["add", "README.md"]);
    git(&work, &["commit", "--quiet", "-m", "seed"]);
    git(&work, &["push", "--quiet", "origin", "main"]);
    (tmp, remote, work)
}

#[test]
fn missing_commit_message_is_a_validation_failure() {
    let (_tmp, _remote, work) = repo();
    syncpush()
        .arg("--path")
        .arg(&work)
        .assert()
        .code(2)
        .stderr(contains("commit_message"));
}

#[test]
fn zero_retries_from_env_is_rejected() {
    let (_tmp, _remote, work) = repo();
    syncpush()
        .env("INPUT_PATH", &work)
        .env("INPUT_COMMIT_MESSAGE", "msg")
        .env("INPUT_MAX_RETRIES", "0")
        .assert()
        .code(2)
        .stderr(contains("max_retries"));
}

#[test]
fn plain_directory_is_not_a_work_tree() {
    let tmp = TempDir::new().unwrap();
    syncpush()
        .args(["--commit-message", "msg", "--path"])
        .arg(tmp.path())
        .assert()
        .code(2)
        .stderr(contains("not a git working tree"));
}

#[test]
fn commit_is_pushed_and_outputs_written() {
    let (tmp, remote, work) = repo();
    fs::write(work.join("data.csv"), "a,b\n1,2\n").unwrap();
    let output_file = tmp.path().join("github_output");
    let summary_file = tmp.path().join("step_summary");

    syncpush()
        .env("GITHUB_OUTPUT", &output_file)
        .env("GITHUB_STEP_SUMMARY", &summary_file)
        .args(["--commit-message", "data: refresh", "--path"])
        .arg(&work)
        .assert()
        .success()
        .stdout(contains("pushed").and(contains("data.csv")));

    let head = git(&remote, &["rev-parse", "refs/heads/main"]);
    let outputs = fs::read_to_string(&output_file).unwrap();
    assert_eq!(outputs, format!("committed=true\ncommit_sha={head}\n"));
    let summary = fs::read_to_string(&summary_file).unwrap();
    assert!(summary.contains("Committed"), "summary: {summary}");
    assert_eq!(
        git(&remote, &["log", "-1", "--format=%an|%s", "main"]),
        "github-actions[bot]|data: refresh"
    );
}

#[test]
fn clean_tree_reports_no_op() {
    let (tmp, _remote, work) = repo();
    let output_file = tmp.path().join("github_output");

    syncpush()
        .env("GITHUB_OUTPUT", &output_file)
        .args(["-m", "noop", "--path"])
        .arg(&work)
        .assert()
        .success()
        .stdout(contains("nothing to commit"));

    assert_eq!(
        fs::read_to_string(&output_file).unwrap(),
        "committed=false\ncommit_sha=\n"
    );
}

#[test]
fn json_flag_prints_the_outcome() {
    let (_tmp, _remote, work) = repo();
    fs::write(work.join("new.txt"), "x\n").unwrap();

    let output = syncpush()
        .args(["--json", "-m", "json run", "--path"])
        .arg(&work)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["committed"], true);
    assert_eq!(json["attempts"], 1);
    assert_eq!(json["files"][0], "new.txt");
}

#[test]
fn config_file_supplies_inputs_and_flags_override() {
    let (tmp, remote, work) = repo();
    fs::write(work.join("a.txt"), "a\n").unwrap();
    let config = tmp.path().join("syncpush.yml");
    fs::write(
        &config,
        "commit_message: from file\ncommit_user_name: File Bot\nmax_retries: 2\n",
    )
    .unwrap();

    syncpush()
        .arg("--config")
        .arg(&config)
        .args(["--commit-user-name", "Flag Bot", "--path"])
        .arg(&work)
        .assert()
        .success();

    assert_eq!(
        git(&remote, &["log", "-1", "--format=%an|%s", "main"]),
        "Flag Bot|from file"
    );
}

#[test]
fn conflict_markers_exit_with_guard_code() {
    let (_tmp, remote, work) = repo();
    let before = git(&remote, &["rev-parse", "refs/heads/main"]);
    fs::write(work.join("bad.txt"), "<<<<<<< HEAD\na\n=======\nb\n>>>>>>> x\n").unwrap();

    syncpush()
        .args(["-m", "should not land", "--path"])
        .arg(&work)
        .assert()
        .code(4)
        .stderr(contains("conflict markers").and(contains("bad.txt:1")));

    assert_eq!(git(&remote, &["rev-parse", "refs/heads/main"]), before);
}

#[test]
fn failed_run_still_writes_outputs() {
    let (tmp, _remote, work) = repo();
    fs::write(work.join("bad.txt"), "<<<<<<< HEAD\na\n").unwrap();
    let output_file = tmp.path().join("github_output");
    let summary_file = tmp.path().join("step_summary");

    syncpush()
        .env("GITHUB_OUTPUT", &output_file)
        .env("GITHUB_STEP_SUMMARY", &summary_file)
        .args(["-m", "should not land", "--path"])
        .arg(&work)
        .assert()
        .code(4);

    assert_eq!(
        fs::read_to_string(&output_file).unwrap(),
        "committed=false\ncommit_sha=\n"
    );
    assert!(fs::read_to_string(&summary_file).unwrap().contains("Failed"));
}

#[test]
fn unwritable_summary_keeps_the_failure_exit_code() {
    let (tmp, _remote, work) = repo();
    fs::write(work.join("bad.txt"), "<<<<<<< HEAD\na\n").unwrap();
    let summary_dir = tmp.path().join("summary-is-a-dir");
    fs::create_dir(&summary_dir).unwrap();

    syncpush()
        .env("GITHUB_STEP_SUMMARY", &summary_dir)
        .args(["-m", "should not land", "--path"])
        .arg(&work)
        .assert()
        .code(4)
        .stderr(contains("failed to write GitHub Actions files"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let (tmp, _remote, work) = repo();
    let config = tmp.path().join("syncpush.yml");
    fs::write(&config, "commit_mesage: typo\n").unwrap();

    syncpush()
        .arg("--config")
        .arg(&config)
        .arg("--path")
        .arg(&work)
        .assert()
        .code(2)
        .stderr(contains("failed to load config file"));
}
