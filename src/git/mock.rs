use crate::error::{GitFlowError, Result};
use crate::git::{RawCommit, Repository, SyncStatus};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<usize>,
    message: String,
    timestamp: i64,
    paths: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockTag {
    commit: usize,
    message: Option<String>,
}

#[derive(Debug, Clone)]
struct InjectedConflict {
    source: Option<String>,
    target: String,
    paths: Vec<String>,
    /// Only surfaces when the merge is recorded, not on a dry run
    late: bool,
}

/// In-memory commit graph for testing without actual git operations.
///
/// Commits record the paths they touch; merging reports a conflict when both
/// sides touched the same path since their merge base. Conflicts can also be
/// injected for a source/target pair, optionally only for the recorded merge
/// so that a dry run passes.
#[derive(Debug, Clone)]
pub struct MockRepository {
    commits: Vec<MockCommit>,
    branches: BTreeMap<String, usize>,
    tags: BTreeMap<String, MockTag>,
    head: Option<String>,
    remote_branches: BTreeSet<String>,
    upstreams: BTreeMap<String, String>,
    behind: BTreeMap<String, usize>,
    dirty: Vec<String>,
    conflicts: Vec<InjectedConflict>,
    clock: i64,
}

impl MockRepository {
    /// A repository with `main` and `develop` at a shared initial commit,
    /// `develop` checked out.
    pub fn new() -> Self {
        Self::with_branches("main", "develop")
    }

    pub fn with_branches(main: &str, develop: &str) -> Self {
        let mut repo = MockRepository {
            commits: Vec::new(),
            branches: BTreeMap::new(),
            tags: BTreeMap::new(),
            head: Some(develop.to_string()),
            remote_branches: BTreeSet::new(),
            upstreams: BTreeMap::new(),
            behind: BTreeMap::new(),
            dirty: Vec::new(),
            conflicts: Vec::new(),
            clock: 1_700_000_000,
        };
        let root = repo.push_commit(Vec::new(), "chore: initial commit", Vec::new());
        repo.branches.insert(main.to_string(), root);
        repo.branches.insert(develop.to_string(), root);
        repo
    }

    /// Add a commit on `branch` touching a file unique to this commit.
    pub fn commit(&mut self, branch: &str, message: &str) -> String {
        let path = format!("file-{}.txt", self.commits.len());
        self.commit_touching(branch, message, &[path.as_str()])
    }

    /// Add a commit on `branch` touching the given paths.
    ///
    /// # Panics
    /// If the branch does not exist.
    pub fn commit_touching(&mut self, branch: &str, message: &str, paths: &[&str]) -> String {
        let parent = self.branches[branch];
        let id = self.push_commit(
            vec![parent],
            message,
            paths.iter().map(|p| p.to_string()).collect(),
        );
        self.branches.insert(branch.to_string(), id);
        hash_of(id)
    }

    /// Add a commit with no parents on a new branch
    pub fn orphan(&mut self, branch: &str, message: &str) -> String {
        let id = self.push_commit(Vec::new(), message, vec!["orphan.txt".to_string()]);
        self.branches.insert(branch.to_string(), id);
        hash_of(id)
    }

    /// Tag the tip of a branch (or any resolvable reference)
    pub fn add_tag(&mut self, name: &str, reference: &str) {
        if let Some(commit) = self.resolve(reference) {
            self.tags.insert(
                name.to_string(),
                MockTag {
                    commit,
                    message: None,
                },
            );
        }
    }

    pub fn add_remote_branch(&mut self, name: &str) {
        self.remote_branches.insert(name.to_string());
    }

    /// Make `branch` track `origin/<branch>` and lag `behind` commits behind it
    pub fn set_behind(&mut self, branch: &str, behind: usize) {
        self.upstreams
            .insert(branch.to_string(), format!("origin/{}", branch));
        self.behind.insert(branch.to_string(), behind);
    }

    pub fn set_dirty(&mut self, paths: &[&str]) {
        self.dirty = paths.iter().map(|p| p.to_string()).collect();
    }

    pub fn detach_head(&mut self) {
        self.head = None;
    }

    /// Make every merge of `source` into `target` conflict on `paths`
    pub fn inject_conflict(&mut self, source: &str, target: &str, paths: &[&str]) {
        self.conflicts.push(InjectedConflict {
            source: Some(source.to_string()),
            target: target.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            late: false,
        });
    }

    /// Make the recorded merge of any branch into `target` conflict, while
    /// dry runs still report a clean merge.
    pub fn inject_late_conflict(&mut self, target: &str, paths: &[&str]) {
        self.conflicts.push(InjectedConflict {
            source: None,
            target: target.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            late: true,
        });
    }

    pub fn branch_tip(&self, name: &str) -> Option<String> {
        self.branches.get(name).map(|id| hash_of(*id))
    }

    pub fn tag_target(&self, name: &str) -> Option<String> {
        self.tags.get(name).map(|t| hash_of(t.commit))
    }

    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.tags.get(name).and_then(|t| t.message.clone())
    }

    pub fn parents_of(&self, hash: &str) -> Vec<String> {
        self.resolve(hash)
            .map(|id| self.commits[id].parents.iter().map(|p| hash_of(*p)).collect())
            .unwrap_or_default()
    }

    pub fn message_of(&self, hash: &str) -> Option<String> {
        self.resolve(hash).map(|id| self.commits[id].message.clone())
    }

    pub fn upstream_of(&self, name: &str) -> Option<String> {
        self.upstreams.get(name).cloned()
    }

    fn push_commit(&mut self, parents: Vec<usize>, message: &str, paths: Vec<String>) -> usize {
        self.clock += 60;
        self.commits.push(MockCommit {
            parents,
            message: message.to_string(),
            timestamp: self.clock,
            paths,
        });
        self.commits.len() - 1
    }

    fn resolve(&self, reference: &str) -> Option<usize> {
        if let Some(id) = self.branches.get(reference) {
            return Some(*id);
        }
        if let Some(tag) = self.tags.get(reference) {
            return Some(tag.commit);
        }
        (0..self.commits.len()).find(|id| hash_of(*id) == reference)
    }

    fn resolve_or_err(&self, reference: &str) -> Result<usize> {
        self.resolve(reference)
            .ok_or_else(|| GitFlowError::branch_not_found(reference))
    }

    fn ancestors(&self, start: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            if seen.insert(id) {
                queue.extend(self.commits[id].parents.iter().copied());
            }
        }
        seen
    }

    fn best_common_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        let left = self.ancestors(a);
        self.ancestors(b)
            .into_iter()
            .filter(|id| left.contains(id))
            .max()
    }

    fn touched_since(&self, tip: usize, base: Option<usize>) -> BTreeSet<String> {
        let excluded = base.map(|b| self.ancestors(b)).unwrap_or_default();
        self.ancestors(tip)
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .flat_map(|id| self.commits[id].paths.iter().cloned())
            .collect()
    }

    fn conflicts_between(&self, source: &str, target: &str, recording: bool) -> Result<Vec<String>> {
        let src = self.resolve_or_err(source)?;
        let dst = self.resolve_or_err(target)?;

        let mut paths: BTreeSet<String> = BTreeSet::new();
        for injected in &self.conflicts {
            let source_matches = injected.source.as_deref().map_or(true, |s| s == source);
            if injected.target == target && source_matches && (recording || !injected.late) {
                paths.extend(injected.paths.iter().cloned());
            }
        }

        let base = self.best_common_ancestor(src, dst);
        let ours = self.touched_since(dst, base);
        let theirs = self.touched_since(src, base);
        paths.extend(ours.intersection(&theirs).cloned());

        Ok(paths.into_iter().collect())
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_of(id: usize) -> String {
    format!("{:07x}{}", id + 1, "0".repeat(33))
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        self.head.clone().ok_or(GitFlowError::DetachedHead)
    }

    fn dirty_paths(&self) -> Result<Vec<String>> {
        Ok(self.dirty.clone())
    }

    fn commits_since(&self, since: Option<&str>, until: &str) -> Result<Vec<RawCommit>> {
        let tip = self.resolve_or_err(until)?;
        let excluded = match since {
            Some(reference) => self.ancestors(self.resolve_or_err(reference)?),
            None => HashSet::new(),
        };

        let mut ids: Vec<usize> = self
            .ancestors(tip)
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .collect();
        ids.sort_unstable();

        Ok(ids
            .into_iter()
            .map(|id| {
                let commit = &self.commits[id];
                RawCommit {
                    hash: hash_of(id),
                    message: commit.message.clone(),
                    timestamp: commit.timestamp,
                    is_merge: commit.parents.len() > 1,
                }
            })
            .collect())
    }

    fn branch_exists(&self, name: &str, remote: Option<&str>) -> Result<bool> {
        Ok(self.branches.contains_key(name)
            || (remote.is_some() && self.remote_branches.contains(name)))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Ok(self.branches.keys().cloned().collect())
    }

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()> {
        if self.branches.contains_key(name) {
            return Err(GitFlowError::BranchAlreadyExists(name.to_string()));
        }
        let tip = self.resolve_or_err(base)?;
        self.branches.insert(name.to_string(), tip);
        Ok(())
    }

    fn checkout(&mut self, name: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(GitFlowError::branch_not_found(name));
        }
        self.head = Some(name.to_string());
        Ok(())
    }

    fn set_upstream(&mut self, name: &str, remote: &str) -> Result<()> {
        if !self.branches.contains_key(name) {
            return Err(GitFlowError::branch_not_found(name));
        }
        self.upstreams
            .insert(name.to_string(), format!("{}/{}", remote, name));
        Ok(())
    }

    fn upstream_status(&self, name: &str) -> Result<SyncStatus> {
        if !self.branches.contains_key(name) {
            return Err(GitFlowError::branch_not_found(name));
        }
        Ok(SyncStatus {
            upstream: self.upstreams.get(name).cloned(),
            ahead: 0,
            behind: self.behind.get(name).copied().unwrap_or(0),
        })
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let a = self.resolve_or_err(a)?;
        let b = self.resolve_or_err(b)?;
        Ok(self.best_common_ancestor(a, b).map(hash_of))
    }

    fn test_merge(&self, source: &str, target: &str) -> Result<Vec<String>> {
        self.conflicts_between(source, target, false)
    }

    fn merge_no_ff(&mut self, source: &str, target: &str, message: &str) -> Result<String> {
        let paths = self.conflicts_between(source, target, true)?;
        if !paths.is_empty() {
            return Err(GitFlowError::MergeConflict {
                branch: source.to_string(),
                target: target.to_string(),
                paths,
            });
        }

        let ours = self.resolve_or_err(target)?;
        let theirs = self.resolve_or_err(source)?;
        if self.ancestors(ours).contains(&theirs) {
            return Ok(hash_of(ours));
        }
        let id = self.push_commit(vec![ours, theirs], message, Vec::new());
        self.branches.insert(target.to_string(), id);
        Ok(hash_of(id))
    }

    fn create_tag(&mut self, name: &str, message: &str, target: &str) -> Result<String> {
        if self.tags.contains_key(name) {
            return Err(GitFlowError::tag(format!("Tag '{}' already exists", name)));
        }
        let commit = self.resolve_or_err(target)?;
        self.tags.insert(
            name.to_string(),
            MockTag {
                commit,
                message: Some(message.to_string()),
            },
        );
        Ok(hash_of(commit))
    }

    fn delete_branch(&mut self, name: &str) -> Result<()> {
        if self.head.as_deref() == Some(name) {
            return Err(GitFlowError::config(format!(
                "Cannot delete the checked out branch '{}'",
                name
            )));
        }
        self.branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GitFlowError::branch_not_found(name))
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.keys().cloned().collect())
    }

    fn tags_reachable_from(&self, reference: &str) -> Result<Vec<String>> {
        let reachable = self.ancestors(self.resolve_or_err(reference)?);
        Ok(self
            .tags
            .iter()
            .filter(|(_, tag)| reachable.contains(&tag.commit))
            .map(|(name, _)| name.clone())
            .collect())
    }
}
