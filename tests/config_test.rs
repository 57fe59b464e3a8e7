// tests/config_test.rs
use git_flow::config::{load_config, parse_config, Config, NoBumpPolicy};
use git_flow::domain::CommitType;
use git_flow::GitFlowError;
use serial_test::serial;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[branches]
main = "master"
protected = ["master", "develop", "staging"]

[commits]
types = ["feat", "fix", "chore"]
max_subject_length = 50

[versioning]
tag_pattern = "release-{version}"
no_bump_policy = "patch"

[behavior]
remote = "upstream"
finish_checks = ["true"]
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.branches.main, "master");
    assert_eq!(config.branches.develop, "develop");
    assert!(config.branches.is_protected("staging"));
    assert_eq!(
        config.commits.types,
        vec![CommitType::Feat, CommitType::Fix, CommitType::Chore]
    );
    assert_eq!(config.commits.max_subject_length, 50);
    assert_eq!(config.versioning.tag_pattern, "release-{version}");
    assert_eq!(config.versioning.no_bump_policy, NoBumpPolicy::Patch);
    assert_eq!(config.behavior.remote, "upstream");
    assert_eq!(config.behavior.finish_checks, vec!["true".to_string()]);
    assert_eq!(config.changelog, Config::default().changelog);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_config(Some(missing.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, GitFlowError::Config(_)));
    assert_eq!(err.kind(), None);
}

#[test]
fn test_invalid_documents_rejected() {
    assert!(parse_config("[branches\nmain = ").is_err());
    assert!(parse_config("[commits]\ntypes = [\"feature\"]").is_err());
    assert!(parse_config("[commits]\ntypes = []").is_err());
    assert!(parse_config("[versioning]\ntag_pattern = \"v1\"").is_err());
    assert!(parse_config("[branches]\nmain = \"trunk\"\ndevelop = \"trunk\"").is_err());
}

#[test]
#[serial]
fn test_discovers_local_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("gitflow.toml"),
        "[branches]\nfeature_prefix = \"feat/\"\n",
    )
    .unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let loaded = load_config(None);
    std::env::set_current_dir(previous).unwrap();

    assert_eq!(loaded.unwrap().branches.feature_prefix, "feat/");
}

#[test]
#[serial]
fn test_explicit_path_wins_over_local_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("gitflow.toml"), "[behavior]\nremote = \"local\"\n").unwrap();
    let mut explicit = NamedTempFile::new().unwrap();
    explicit
        .write_all(b"[behavior]\nremote = \"explicit\"\n")
        .unwrap();
    explicit.flush().unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let loaded = load_config(Some(explicit.path().to_str().unwrap()));
    std::env::set_current_dir(previous).unwrap();

    assert_eq!(loaded.unwrap().behavior.remote, "explicit");
}
