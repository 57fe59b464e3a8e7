// tests/cli_test.rs
//
// Runs the built binary the way git hooks and agents invoke it.
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn git_flow(dir: &TempDir, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_git-flow"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start git-flow");

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }
    child.wait_with_output().unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = git_flow(&dir, &["--help"], None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("validate-commit"));
    assert!(stdout.contains("finish-branch"));
}

#[test]
fn test_validate_commit_exit_codes() {
    let dir = TempDir::new().unwrap();
    let ok = git_flow(&dir, &["validate-commit", "feat(auth): add login"], None);
    assert_eq!(ok.status.code(), Some(0));

    let bad = git_flow(&dir, &["validate-commit", "Added stuff"], None);
    assert_eq!(bad.status.code(), Some(1));
}

#[test]
fn test_validate_commit_json() {
    let dir = TempDir::new().unwrap();
    let output = git_flow(
        &dir,
        &["--json", "validate-commit", "fix!: critical auth bypass"],
        None,
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["record"]["type"], "fix");
    assert_eq!(json["record"]["is_breaking"], true);
}

#[test]
fn test_commit_msg_guard_ignores_comments() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("COMMIT_EDITMSG");
    std::fs::write(&file, "docs: explain setup\n# Please enter the commit message\n").unwrap();
    let output = git_flow(
        &dir,
        &["guard", "commit-msg", file.to_str().unwrap()],
        None,
    );
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_branch_name_guard() {
    let dir = TempDir::new().unwrap();
    let ok = git_flow(&dir, &["guard", "branch-name", "feature/user-auth"], None);
    assert_eq!(ok.status.code(), Some(0));

    let bad = git_flow(
        &dir,
        &["--json", "guard", "branch-name", "feat/something"],
        None,
    );
    assert_eq!(bad.status.code(), Some(1));
    let json = stdout_json(&bad);
    assert_eq!(json["allowed"], false);
    assert_eq!(json["kind"], "InvalidBranchName");
}

#[test]
fn test_pre_push_guard_reads_refs() {
    let dir = TempDir::new().unwrap();
    let zero = "0000000000000000000000000000000000000000";
    let line = format!("refs/heads/main {} refs/heads/main {}\n", zero, zero);
    let output = git_flow(
        &dir,
        &["guard", "pre-push", "origin", "git@example.com:demo.git"],
        Some(&line),
    );
    assert_eq!(output.status.code(), Some(1));

    let line = format!("refs/heads/feature/a {} refs/heads/feature/a {}\n", zero, zero);
    let output = git_flow(
        &dir,
        &["guard", "pre-push", "origin", "git@example.com:demo.git"],
        Some(&line),
    );
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_pre_push_tag_only_on_develop() {
    let dir = TempDir::new().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();
    let sig = git2::Signature::now("Test", "test@example.com").unwrap();
    let tree_id = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let oid = repo
        .commit(Some("refs/heads/develop"), &sig, &sig, "chore: init", &tree, &[])
        .unwrap();
    repo.set_head("refs/heads/develop").unwrap();

    let zero = "0000000000000000000000000000000000000000";
    let line = format!("refs/tags/v1.0.0 {} refs/tags/v1.0.0 {}\n", oid, zero);
    let output = git_flow(
        &dir,
        &["guard", "pre-push", "origin", "git@example.com:demo.git"],
        Some(&line),
    );
    assert_eq!(output.status.code(), Some(0));

    // No ref lines: the current branch is the push target
    let output = git_flow(
        &dir,
        &["guard", "pre-push", "origin", "git@example.com:demo.git"],
        None,
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_hook_decision() {
    let dir = TempDir::new().unwrap();
    let event = r#"{"tool_name":"Bash","tool_input":{"command":"git push origin main"}}"#;
    let output = git_flow(&dir, &["hook"], Some(event));
    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PreToolUse");
    assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "deny");

    let event = r#"{"tool_name":"Bash","tool_input":{"command":"git checkout -b feature/login"}}"#;
    let output = git_flow(&dir, &["hook"], Some(event));
    assert_eq!(
        stdout_json(&output)["hookSpecificOutput"]["permissionDecision"],
        "allow"
    );
}

#[test]
fn test_hook_rejects_malformed_input() {
    let dir = TempDir::new().unwrap();
    let output = git_flow(&dir, &["--json", "hook"], Some("not json"));
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["ok"], false);
}

#[test]
fn test_lifecycle_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    let output = git_flow(&dir, &["create-feature", "login"], None);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR"));
}
