//! Guard predicates.
//!
//! Guards are pure: they look at a name or a message, never at repository
//! state, and always answer with a fully populated [`GuardResult`].

use crate::config::{BranchesConfig, Config};
use crate::conventional::CommitValidator;
use crate::domain::Branch;
use crate::error::{ErrorKind, GitFlowError};
use serde::Serialize;
use std::fmt;

/// Verdict of a guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardResult {
    pub allowed: bool,
    /// Taxonomy kind of a denial; `None` when allowed
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl GuardResult {
    pub fn allow(message: impl Into<String>) -> Self {
        GuardResult {
            allowed: true,
            kind: None,
            message: message.into(),
        }
    }

    pub fn deny(kind: ErrorKind, message: impl Into<String>) -> Self {
        GuardResult {
            allowed: false,
            kind: Some(kind),
            message: message.into(),
        }
    }
}

/// Kind of mutation a protected-branch check is asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Commit,
    Push,
    Merge,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Commit => "commit",
            Operation::Push => "push",
            Operation::Merge => "merge",
        })
    }
}

/// Who is performing a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOrigin {
    /// A user or tool acting on the branch directly
    Direct,
    /// The lifecycle manager finishing a flow branch
    FlowFinish,
}

pub struct Guard {
    branches: BranchesConfig,
    validator: CommitValidator,
}

impl Guard {
    pub fn new(config: &Config) -> Self {
        Guard {
            branches: config.branches.clone(),
            validator: CommitValidator::new(&config.commits),
        }
    }

    /// Reject direct commits and pushes to protected branches.
    ///
    /// Merges recorded while finishing a flow branch are always allowed.
    pub fn check_protected(&self, branch: &str, op: Operation, origin: MutationOrigin) -> GuardResult {
        if !self.branches.is_protected(branch) {
            return GuardResult::allow(format!("'{}' is not protected", branch));
        }
        if origin == MutationOrigin::FlowFinish {
            return GuardResult::allow(format!(
                "{} into '{}' performed by finish",
                op, branch
            ));
        }

        let err = GitFlowError::ProtectedBranchViolation {
            branch: branch.to_string(),
            operation: op.to_string(),
        };
        let hint = match op {
            Operation::Push => "Finish a flow branch instead of pushing directly",
            _ => "Create a feature or hotfix branch and finish it instead",
        };
        GuardResult::deny(
            ErrorKind::ProtectedBranchViolation,
            format!("{}. {}", err, hint),
        )
    }

    /// Accept exactly the long-lived names and well-formed flow branch names.
    pub fn check_branch_name(&self, name: &str) -> GuardResult {
        match Branch::parse(name, &self.branches) {
            Ok(branch) => GuardResult::allow(format!("'{}' is a valid {} branch", name, branch.kind())),
            Err(e) => GuardResult::deny(ErrorKind::InvalidBranchName, e.to_string()),
        }
    }

    /// Delegate to the commit grammar.
    pub fn check_commit_message(&self, message: &str) -> GuardResult {
        match self.validator.validate(message) {
            Ok(record) => GuardResult::allow(format!("Valid {} commit", record.commit_type)),
            Err(violation) => GuardResult::deny(ErrorKind::InvalidCommitFormat, violation.to_string()),
        }
    }
}
