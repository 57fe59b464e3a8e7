//! Repository port
//!
//! This module provides a trait-based abstraction over the version control
//! operations the workflow needs, allowing for a real implementation backed by
//! libgit2 and an in-memory implementation for testing.
//!
//! # Overview
//!
//! - [repository::Git2Repository]: the real implementation using the `git2` crate
//! - [mock::MockRepository]: an in-memory commit graph for tests
//!
//! # Usage
//!
//! Workflow code depends on the [Repository] trait only.
//!
//! ```rust
//! # use git_flow::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> git_flow::Result<()> {
//! let commits = repo.commits_since(Some("v1.0.0"), "develop")?;
//! println!("{} commits since v1.0.0", commits.len());
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use serde::Serialize;

/// A commit as read from history, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    /// Full commit hash
    pub hash: String,
    /// Full commit message
    pub message: String,
    /// Commit time, seconds since the Unix epoch
    pub timestamp: i64,
    /// More than one parent
    pub is_merge: bool,
}

/// Relation between a local branch and its upstream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SyncStatus {
    /// Upstream reference name, `None` when the branch does not track one
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
}

/// Narrow interface over version control state.
///
/// ## Single actor
///
/// The workflow is sequential: one caller reads and mutates a repository at a
/// time. Mutating methods take `&mut self` so the borrow checker enforces it
/// in-process; concurrent external processes are not coordinated.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map underlying
/// errors (like `git2::Error`) to [crate::error::GitFlowError] variants. A
/// merge that conflicts reports `MergeConflict` with the conflicted paths and
/// leaves every reference untouched.
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository)
/// - [MockRepository](mock::MockRepository)
pub trait Repository: Send {
    /// Name of the checked out branch
    ///
    /// # Returns
    /// * `Ok(String)` - Branch name without the `refs/heads/` prefix
    /// * `Err` - `DetachedHead` when HEAD does not point at a branch
    fn current_branch(&self) -> Result<String>;

    /// Paths with uncommitted changes, untracked files included.
    ///
    /// An empty list means the working tree is clean.
    fn dirty_paths(&self) -> Result<Vec<String>>;

    /// Commits reachable from `until` but not from `since`
    ///
    /// # Arguments
    /// * `since` - Exclusive lower bound (tag or branch); `None` walks the full history
    /// * `until` - Inclusive upper bound (tag or branch)
    ///
    /// # Returns
    /// * `Ok(Vec<RawCommit>)` - Commits oldest first
    /// * `Err` - If either reference cannot be resolved
    fn commits_since(&self, since: Option<&str>, until: &str) -> Result<Vec<RawCommit>>;

    /// Whether a branch exists locally, or on the configured remote when
    /// `remote` is given.
    fn branch_exists(&self, name: &str, remote: Option<&str>) -> Result<bool>;

    /// Local branch names, sorted
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Create `name` pointing at the tip of `base`. Does not check it out.
    fn create_branch(&mut self, name: &str, base: &str) -> Result<()>;

    /// Check out an existing local branch
    fn checkout(&mut self, name: &str) -> Result<()>;

    /// Record `remote/name` as the upstream of `name` without contacting it
    fn set_upstream(&mut self, name: &str, remote: &str) -> Result<()>;

    /// Ahead/behind counts of a branch against its upstream
    fn upstream_status(&self, name: &str) -> Result<SyncStatus>;

    /// Best common ancestor of two references, `None` for unrelated histories
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    /// Compute the merge of `source` into `target` without recording it.
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Conflicted paths; empty when the merge is clean
    fn test_merge(&self, source: &str, target: &str) -> Result<Vec<String>>;

    /// Record a non-fast-forward merge of `source` into `target`
    ///
    /// The target branch gets a new commit with two parents even when a fast
    /// forward would be possible. A checked-out target also has its working
    /// tree updated. When `target` already contains `source` nothing is
    /// recorded and the current tip of `target` is returned.
    ///
    /// # Returns
    /// * `Ok(String)` - Hash of the merge commit
    /// * `Err` - `MergeConflict` with the conflicted paths; nothing is changed
    fn merge_no_ff(&mut self, source: &str, target: &str, message: &str) -> Result<String>;

    /// Create an annotated tag at the tip of `target`
    ///
    /// # Returns
    /// * `Ok(String)` - Hash of the tagged commit
    /// * `Err` - If the tag already exists or the target cannot be resolved
    fn create_tag(&mut self, name: &str, message: &str, target: &str) -> Result<String>;

    /// Delete a local branch. The branch must not be checked out.
    fn delete_branch(&mut self, name: &str) -> Result<()>;

    /// All tag names, sorted alphabetically
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Tags whose commit is reachable from `reference`
    fn tags_reachable_from(&self, reference: &str) -> Result<Vec<String>>;
}
