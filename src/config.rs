use crate::domain::{CommitType, TagPattern};
use crate::error::{GitFlowError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the complete configuration for git-flow.
///
/// Contains branch naming rules, commit grammar settings, version tagging,
/// changelog layout and behavior options.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub commits: CommitsConfig,

    #[serde(default)]
    pub versioning: VersioningConfig,

    #[serde(default)]
    pub changelog: ChangelogConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_main() -> String {
    "main".to_string()
}

fn default_develop() -> String {
    "develop".to_string()
}

fn default_protected() -> Vec<String> {
    vec![default_main(), default_develop()]
}

fn default_feature_prefix() -> String {
    "feature/".to_string()
}

fn default_release_prefix() -> String {
    "release/".to_string()
}

fn default_hotfix_prefix() -> String {
    "hotfix/".to_string()
}

fn default_max_token_length() -> usize {
    100
}

/// Long-lived branch names, flow prefixes and the protected set.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_main")]
    pub main: String,

    #[serde(default = "default_develop")]
    pub develop: String,

    #[serde(default = "default_protected")]
    pub protected: Vec<String>,

    #[serde(default = "default_feature_prefix")]
    pub feature_prefix: String,

    #[serde(default = "default_release_prefix")]
    pub release_prefix: String,

    #[serde(default = "default_hotfix_prefix")]
    pub hotfix_prefix: String,

    /// Upper bound on the part of a flow branch name after its prefix
    #[serde(default = "default_max_token_length")]
    pub max_token_length: usize,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            main: default_main(),
            develop: default_develop(),
            protected: default_protected(),
            feature_prefix: default_feature_prefix(),
            release_prefix: default_release_prefix(),
            hotfix_prefix: default_hotfix_prefix(),
            max_token_length: default_max_token_length(),
        }
    }
}

impl BranchesConfig {
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected.iter().any(|p| p == branch)
    }
}

/// Returns the default list of conventional commit types.
fn default_commit_types() -> Vec<CommitType> {
    CommitType::ALL.to_vec()
}

/// Returns the default list of breaking change indicators.
fn default_breaking_change_indicators() -> Vec<String> {
    vec![
        "BREAKING CHANGE:".to_string(),
        "BREAKING-CHANGE:".to_string(),
    ]
}

fn default_max_subject_length() -> usize {
    72
}

/// Commit grammar settings.
///
/// `types` may only restrict the closed set; an unknown type fails to load.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommitsConfig {
    #[serde(default = "default_commit_types")]
    pub types: Vec<CommitType>,

    #[serde(default = "default_max_subject_length")]
    pub max_subject_length: usize,

    #[serde(default = "default_breaking_change_indicators")]
    pub breaking_change_indicators: Vec<String>,
}

impl Default for CommitsConfig {
    fn default() -> Self {
        CommitsConfig {
            types: default_commit_types(),
            max_subject_length: default_max_subject_length(),
            breaking_change_indicators: default_breaking_change_indicators(),
        }
    }
}

/// What to do when the commits since the last tag warrant no bump
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoBumpPolicy {
    /// Suggest nothing; creating a release without an explicit version fails
    #[default]
    Refuse,
    /// Force a patch bump
    Patch,
}

fn default_tag_pattern() -> String {
    "v{version}".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersioningConfig {
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    #[serde(default)]
    pub no_bump_policy: NoBumpPolicy,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        VersioningConfig {
            tag_pattern: default_tag_pattern(),
            no_bump_policy: NoBumpPolicy::default(),
        }
    }
}

impl VersioningConfig {
    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.as_str())
    }
}

fn default_changelog_path() -> PathBuf {
    PathBuf::from("CHANGELOG.md")
}

fn default_changelog_title() -> String {
    "Changelog".to_string()
}

fn default_changelog_preamble() -> String {
    "All notable changes to this project will be documented in this file.\n\n\
     The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),\n\
     and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html)."
        .to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangelogConfig {
    #[serde(default = "default_changelog_path")]
    pub path: PathBuf,

    #[serde(default = "default_changelog_title")]
    pub title: String,

    #[serde(default = "default_changelog_preamble")]
    pub preamble: String,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        ChangelogConfig {
            path: default_changelog_path(),
            title: default_changelog_title(),
            preamble: default_changelog_preamble(),
        }
    }
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration for behavior customization.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Remote consulted for branch existence and upstream tracking
    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_true")]
    pub delete_branch_after_finish: bool,

    /// Shell commands that must succeed before a branch is finished
    #[serde(default)]
    pub finish_checks: Vec<String>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            remote: default_remote(),
            delete_branch_after_finish: true,
            finish_checks: Vec::new(),
        }
    }
}

impl Config {
    /// Reject settings that would make the workflow unusable.
    pub fn validate(&self) -> Result<()> {
        self.versioning.tag_pattern()?;

        if self.commits.types.is_empty() {
            return Err(GitFlowError::config("commits.types must not be empty"));
        }
        if self.commits.max_subject_length == 0 {
            return Err(GitFlowError::config(
                "commits.max_subject_length must be positive",
            ));
        }
        if self.branches.max_token_length == 0 {
            return Err(GitFlowError::config(
                "branches.max_token_length must be positive",
            ));
        }
        if self.branches.main == self.branches.develop {
            return Err(GitFlowError::config(
                "branches.main and branches.develop must differ",
            ));
        }
        for prefix in [
            &self.branches.feature_prefix,
            &self.branches.release_prefix,
            &self.branches.hotfix_prefix,
        ] {
            if prefix.is_empty() {
                return Err(GitFlowError::config("branch prefixes must not be empty"));
            }
        }
        Ok(())
    }
}

/// Parse configuration from TOML text and validate it.
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(text).map_err(|e| GitFlowError::config(format!("Invalid TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow.toml` in current directory
/// 3. `.gitflow.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(PathBuf::from(path)),
        None => discover_config_file(),
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            let text = fs::read_to_string(&path).map_err(|e| {
                GitFlowError::config(format!("Cannot read {}: {}", path.display(), e))
            })?;
            parse_config(&text)
        }
        None => Ok(Config::default()),
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let local = Path::new("./gitflow.toml");
    if local.exists() {
        return Some(local.to_path_buf());
    }
    let global = dirs::config_dir()?.join(".gitflow.toml");
    global.exists().then_some(global)
}
