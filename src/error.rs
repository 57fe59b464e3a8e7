use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Closed taxonomy of workflow failures.
///
/// Every guard verdict and every lifecycle rejection that a caller may want to
/// branch on maps to exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidCommitFormat,
    InvalidBranchName,
    ProtectedBranchViolation,
    DirtyWorkingTree,
    BranchAlreadyExists,
    WrongBaseBranch,
    /// Informational: the baseline version falls back to 0.0.0.
    NoTagsFound,
    MergeConflict,
    DevelopMergeIncomplete,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCommitFormat => "InvalidCommitFormat",
            ErrorKind::InvalidBranchName => "InvalidBranchName",
            ErrorKind::ProtectedBranchViolation => "ProtectedBranchViolation",
            ErrorKind::DirtyWorkingTree => "DirtyWorkingTree",
            ErrorKind::BranchAlreadyExists => "BranchAlreadyExists",
            ErrorKind::WrongBaseBranch => "WrongBaseBranch",
            ErrorKind::NoTagsFound => "NoTagsFound",
            ErrorKind::MergeConflict => "MergeConflict",
            ErrorKind::DevelopMergeIncomplete => "DevelopMergeIncomplete",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for git-flow operations
#[derive(Error, Debug)]
pub enum GitFlowError {
    #[error("Invalid commit message ({rule}): {text}")]
    InvalidCommitFormat { rule: String, text: String },

    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("Direct {operation} on protected branch '{branch}' is not allowed")]
    ProtectedBranchViolation { branch: String, operation: String },

    #[error("Working tree has uncommitted changes: {}", .paths.join(", "))]
    DirtyWorkingTree { paths: Vec<String> },

    #[error("Branch '{0}' already exists")]
    BranchAlreadyExists(String),

    #[error("Branch '{branch}' does not share history with '{expected}'")]
    WrongBaseBranch { branch: String, expected: String },

    #[error("Merging '{branch}' into '{target}' conflicts: {}", .paths.join(", "))]
    MergeConflict {
        branch: String,
        target: String,
        paths: Vec<String>,
    },

    #[error(
        "Tag '{tag}' was created on main but merging '{branch}' into develop conflicts: {}. \
         Resolve the merge manually; '{branch}' was kept",
        .paths.join(", ")
    )]
    DevelopMergeIncomplete {
        branch: String,
        tag: String,
        paths: Vec<String>,
    },

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Branch '{branch}' is {behind} commit(s) behind its upstream")]
    BranchBehindUpstream { branch: String, behind: usize },

    #[error("Not on a feature, release or hotfix branch (current: {0})")]
    NotOnFlowBranch(String),

    #[error("HEAD is detached")]
    DetachedHead,

    #[error("Version error: {0}")]
    Version(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("No release warranted: {0}")]
    NoReleaseWarranted(String),

    #[error("Finish checks failed: {0}")]
    ChecksFailed(String),

    #[error("Invalid hook input: {0}")]
    HookInput(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-flow
pub type Result<T> = std::result::Result<T, GitFlowError>;

impl GitFlowError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitFlowError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        GitFlowError::Version(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        GitFlowError::Tag(msg.into())
    }

    pub fn branch_not_found(name: impl Into<String>) -> Self {
        GitFlowError::BranchNotFound(name.into())
    }

    /// The taxonomy kind of this error, if it belongs to the closed set.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GitFlowError::InvalidCommitFormat { .. } => Some(ErrorKind::InvalidCommitFormat),
            GitFlowError::InvalidBranchName { .. } => Some(ErrorKind::InvalidBranchName),
            GitFlowError::ProtectedBranchViolation { .. } => {
                Some(ErrorKind::ProtectedBranchViolation)
            }
            GitFlowError::DirtyWorkingTree { .. } => Some(ErrorKind::DirtyWorkingTree),
            GitFlowError::BranchAlreadyExists(_) => Some(ErrorKind::BranchAlreadyExists),
            GitFlowError::WrongBaseBranch { .. } => Some(ErrorKind::WrongBaseBranch),
            GitFlowError::MergeConflict { .. } => Some(ErrorKind::MergeConflict),
            GitFlowError::DevelopMergeIncomplete { .. } => Some(ErrorKind::DevelopMergeIncomplete),
            _ => None,
        }
    }

    /// Paths reported by merge failures; empty for every other error.
    pub fn conflicted_paths(&self) -> &[String] {
        match self {
            GitFlowError::MergeConflict { paths, .. }
            | GitFlowError::DevelopMergeIncomplete { paths, .. } => paths,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GitFlowError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GitFlowError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_taxonomy_kinds() {
        let cases = vec![
            (
                GitFlowError::InvalidCommitFormat {
                    rule: "empty".into(),
                    text: String::new(),
                },
                ErrorKind::InvalidCommitFormat,
            ),
            (
                GitFlowError::InvalidBranchName {
                    name: "Bad Name!".into(),
                    reason: "x".into(),
                },
                ErrorKind::InvalidBranchName,
            ),
            (
                GitFlowError::DirtyWorkingTree {
                    paths: vec!["a.txt".into()],
                },
                ErrorKind::DirtyWorkingTree,
            ),
            (
                GitFlowError::BranchAlreadyExists("feature/x".into()),
                ErrorKind::BranchAlreadyExists,
            ),
            (
                GitFlowError::MergeConflict {
                    branch: "feature/x".into(),
                    target: "develop".into(),
                    paths: vec![],
                },
                ErrorKind::MergeConflict,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), Some(kind), "wrong kind for {}", err);
        }
    }

    #[test]
    fn test_develop_merge_incomplete_names_paths_and_tag() {
        let err = GitFlowError::DevelopMergeIncomplete {
            branch: "release/v1.1.0".into(),
            tag: "v1.1.0".into(),
            paths: vec!["src/lib.rs".into(), "README.md".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("v1.1.0"));
        assert!(msg.contains("src/lib.rs, README.md"));
        assert_eq!(err.conflicted_paths().len(), 2);
    }

    #[test]
    fn test_operational_errors_have_no_kind() {
        assert_eq!(GitFlowError::DetachedHead.kind(), None);
        assert_eq!(GitFlowError::version("bad").kind(), None);
        assert!(GitFlowError::tag("x").conflicted_paths().is_empty());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            ErrorKind::ProtectedBranchViolation.to_string(),
            "ProtectedBranchViolation"
        );
        assert_eq!(ErrorKind::NoTagsFound.as_str(), "NoTagsFound");
    }
}
