use crate::error::ErrorKind;
use serde::Serialize;
use std::fmt;

/// Warnings that occur when reading history near repository boundaries.
/// These are non-fatal issues that should be reported to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum BoundaryWarning {
    /// No version tag is reachable; the baseline falls back to 0.0.0
    NoTagsFound { reference: String },
    /// No new commits since the latest tag
    NoNewCommits { latest_tag: String, reference: String },
    /// Tag follows the tag pattern but its version cannot be parsed
    UnparsableTag { tag: String, reason: String },
    /// Commit message does not follow the grammar and was left out
    UnclassifiedCommit {
        hash: String,
        subject: String,
        reason: String,
    },
}

impl BoundaryWarning {
    /// Taxonomy kind for warnings that belong to the closed error set
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BoundaryWarning::NoTagsFound { .. } => Some(ErrorKind::NoTagsFound),
            _ => None,
        }
    }
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoTagsFound { reference } => {
                write!(
                    f,
                    "No version tags reachable from '{}'; using baseline 0.0.0",
                    reference
                )
            }
            BoundaryWarning::NoNewCommits {
                latest_tag,
                reference,
            } => {
                write!(f, "No new commits on '{}' since tag '{}'", reference, latest_tag)
            }
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Cannot parse tag '{}': {}", tag, reason)
            }
            BoundaryWarning::UnclassifiedCommit {
                hash,
                subject,
                reason,
            } => {
                let short_hash = hash.get(..7).unwrap_or(hash.as_str());
                write!(f, "Skipping {} '{}': {}", short_hash, subject, reason)
            }
        }
    }
}
