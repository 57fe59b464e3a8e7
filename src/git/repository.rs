use crate::error::{GitFlowError, Result};
use crate::git::{RawCommit, Repository, SyncStatus};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, ErrorCode, Index, ObjectType, Repository as Git2Repo, Sort, StatusOptions,
};
use std::collections::BTreeSet;
use std::path::Path;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Root of the working tree, `None` for bare repositories
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Resolve a local branch first, then any revision (tag, hash, remote ref).
    fn resolve_commit(&self, reference: &str) -> Result<Commit<'_>> {
        let object = match self.repo.find_branch(reference, BranchType::Local) {
            Ok(branch) => branch.get().peel(ObjectType::Commit)?,
            Err(_) => self
                .repo
                .revparse_single(reference)
                .map_err(|_| GitFlowError::branch_not_found(reference))?,
        };
        Ok(object.peel_to_commit()?)
    }

    fn has_branch(&self, name: &str, kind: BranchType) -> Result<bool> {
        match self.repo.find_branch(name, kind) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn configured_upstream(&self, name: &str) -> Option<String> {
        let config = self.repo.config().ok()?;
        let remote = config.get_string(&format!("branch.{}.remote", name)).ok()?;
        let merge = config.get_string(&format!("branch.{}.merge", name)).ok()?;
        let branch = merge.strip_prefix("refs/heads/").unwrap_or(&merge);
        Some(format!("{}/{}", remote, branch))
    }
}

fn conflicted_paths(index: &Index) -> Result<Vec<String>> {
    if !index.has_conflicts() {
        return Ok(Vec::new());
    }

    let mut paths = BTreeSet::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        for entry in [conflict.ancestor, conflict.our, conflict.their]
            .into_iter()
            .flatten()
        {
            paths.insert(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths.into_iter().collect())
}

impl Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // Fresh repository: HEAD names a branch that has no commit yet
                let head = self.repo.find_reference("HEAD")?;
                return head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(str::to_string)
                    .ok_or(GitFlowError::DetachedHead);
            }
            Err(e) => return Err(e.into()),
        };

        if !head.is_branch() {
            return Err(GitFlowError::DetachedHead);
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or(GitFlowError::DetachedHead)
    }

    fn dirty_paths(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| !entry.status().is_ignored())
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect())
    }

    fn commits_since(&self, since: Option<&str>, until: &str) -> Result<Vec<RawCommit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;
        revwalk.push(self.resolve_commit(until)?.id())?;
        if let Some(since) = since {
            revwalk.hide(self.resolve_commit(since)?.id())?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            let commit = self.repo.find_commit(oid)?;

            commits.push(RawCommit {
                hash: oid.to_string(),
                message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
                timestamp: commit.time().seconds(),
                is_merge: commit.parent_count() > 1,
            });
        }

        Ok(commits)
    }

    fn branch_exists(&self, name: &str, remote: Option<&str>) -> Result<bool> {
        if self.has_branch(name, BranchType::Local)? {
            return Ok(true);
        }
        match remote {
            Some(remote) => self.has_branch(&format!("{}/{}", remote, name), BranchType::Remote),
            None => Ok(false),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn create_branch(&mut self, name: &str, base: &str) -> Result<()> {
        if self.has_branch(name, BranchType::Local)? {
            return Err(GitFlowError::BranchAlreadyExists(name.to_string()));
        }
        let commit = self.resolve_commit(base)?;
        self.repo.branch(name, &commit, false)?;
        Ok(())
    }

    fn checkout(&mut self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", name);
        let object = self
            .repo
            .revparse_single(&refname)
            .map_err(|_| GitFlowError::branch_not_found(name))?;

        let mut opts = CheckoutBuilder::new();
        opts.safe();
        self.repo.checkout_tree(&object, Some(&mut opts))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn set_upstream(&mut self, name: &str, remote: &str) -> Result<()> {
        if !self.has_branch(name, BranchType::Local)? {
            return Err(GitFlowError::branch_not_found(name));
        }
        let mut config = self.repo.config()?;
        config.set_str(&format!("branch.{}.remote", name), remote)?;
        config.set_str(
            &format!("branch.{}.merge", name),
            &format!("refs/heads/{}", name),
        )?;
        Ok(())
    }

    fn upstream_status(&self, name: &str) -> Result<SyncStatus> {
        let branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitFlowError::branch_not_found(name))?;

        let upstream = match branch.upstream() {
            Ok(upstream) => upstream,
            Err(_) => {
                return Ok(SyncStatus {
                    upstream: self.configured_upstream(name),
                    ahead: 0,
                    behind: 0,
                })
            }
        };

        let upstream_name = upstream.name()?.map(str::to_string);
        let (ahead, behind) = match (branch.get().target(), upstream.get().target()) {
            (Some(local), Some(remote)) => self.repo.graph_ahead_behind(local, remote)?,
            _ => (0, 0),
        };

        Ok(SyncStatus {
            upstream: upstream_name,
            ahead,
            behind,
        })
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let a = self.resolve_commit(a)?.id();
        let b = self.resolve_commit(b)?.id();
        match self.repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid.to_string())),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn test_merge(&self, source: &str, target: &str) -> Result<Vec<String>> {
        let ours = self.resolve_commit(target)?;
        let theirs = self.resolve_commit(source)?;
        let index = self.repo.merge_commits(&ours, &theirs, None)?;
        conflicted_paths(&index)
    }

    fn merge_no_ff(&mut self, source: &str, target: &str, message: &str) -> Result<String> {
        let ours = self.resolve_commit(target)?;
        let theirs = self.resolve_commit(source)?;
        if ours.id() == theirs.id() || self.repo.graph_descendant_of(ours.id(), theirs.id())? {
            // already up to date
            return Ok(ours.id().to_string());
        }

        let mut index = self.repo.merge_commits(&ours, &theirs, None)?;
        let paths = conflicted_paths(&index)?;
        if !paths.is_empty() {
            return Err(GitFlowError::MergeConflict {
                branch: source.to_string(),
                target: target.to_string(),
                paths,
            });
        }

        let tree_id = index.write_tree_to(&self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;

        // A checked-out target gets its files updated before the ref moves
        if self.current_branch().ok().as_deref() == Some(target) {
            let mut opts = CheckoutBuilder::new();
            opts.safe();
            self.repo.checkout_tree(tree.as_object(), Some(&mut opts))?;
        }

        let signature = self.repo.signature()?;
        let oid = self.repo.commit(
            Some(&format!("refs/heads/{}", target)),
            &signature,
            &signature,
            message,
            &tree,
            &[&ours, &theirs],
        )?;

        Ok(oid.to_string())
    }

    fn create_tag(&mut self, name: &str, message: &str, target: &str) -> Result<String> {
        if self.repo.find_reference(&format!("refs/tags/{}", name)).is_ok() {
            return Err(GitFlowError::tag(format!("Tag '{}' already exists", name)));
        }

        let commit = self.resolve_commit(target)?;
        let signature = self.repo.signature()?;
        self.repo
            .tag(name, commit.as_object(), &signature, message, false)
            .map_err(|e| GitFlowError::tag(format!("Cannot create tag '{}': {}", name, e)))?;

        Ok(commit.id().to_string())
    }

    fn delete_branch(&mut self, name: &str) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitFlowError::branch_not_found(name))?;
        branch.delete()?;
        Ok(())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let tags = self.repo.tag_names(None)?;

        let mut names: Vec<String> = tags.iter().flatten().map(|s| s.to_string()).collect();
        names.sort();
        Ok(names)
    }

    fn tags_reachable_from(&self, reference: &str) -> Result<Vec<String>> {
        let tip = self.resolve_commit(reference)?.id();

        let mut reachable = Vec::new();
        for name in self.list_tags()? {
            let object = self.repo.revparse_single(&format!("refs/tags/{}", name))?;
            let Ok(commit) = object.peel_to_commit() else {
                continue;
            };
            if commit.id() == tip || self.repo.graph_descendant_of(tip, commit.id())? {
                reachable.push(name);
            }
        }
        Ok(reachable)
    }
}
