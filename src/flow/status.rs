use super::{FlowManager, FlowState};
use crate::analyzer::tags;
use crate::domain::{Branch, BranchKind};
use crate::error::{GitFlowError, Result};
use crate::git::{Repository, SyncStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Snapshot of the workflow as seen from the checked out branch
#[derive(Debug, Clone, Serialize)]
pub struct FlowStatus {
    /// `None` when HEAD is detached
    pub current_branch: Option<String>,
    pub state: FlowState,
    pub kind: Option<BranchKind>,
    pub clean: bool,
    pub dirty_paths: Vec<String>,
    pub sync: Option<SyncStatus>,
    /// Local branches keyed by kind; names that follow no rule are under `other`
    pub branches: BTreeMap<String, Vec<String>>,
    /// Highest version tag reachable from main
    pub latest_tag: Option<String>,
    /// Reasons the current flow branch cannot be finished right now
    pub issues: Vec<String>,
}

impl FlowStatus {
    pub fn ready_to_finish(&self) -> bool {
        self.state != FlowState::NoActiveFlowBranch && self.issues.is_empty()
    }
}

impl<R: Repository> FlowManager<R> {
    /// Read-only view of the current workflow state and finish readiness.
    pub fn status(&self) -> Result<FlowStatus> {
        let current = match self.repo.current_branch() {
            Ok(name) => Some(name),
            Err(GitFlowError::DetachedHead) => None,
            Err(e) => return Err(e),
        };
        let parsed = current
            .as_deref()
            .and_then(|name| Branch::parse(name, &self.config.branches).ok());

        let dirty_paths = self.repo.dirty_paths()?;
        let sync = match &current {
            Some(name) => Some(self.repo.upstream_status(name)?),
            None => None,
        };

        let mut branches: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in self.repo.list_branches()? {
            let group = Branch::parse(&name, &self.config.branches)
                .map(|b| b.kind().to_string())
                .unwrap_or_else(|_| "other".to_string());
            branches.entry(group).or_default().push(name);
        }

        let main = &self.config.branches.main;
        let latest_tag = if self.repo.branch_exists(main, None)? {
            tags::latest_integrated(&self.repo, main, self.advisor.pattern())?
                .0
                .map(|t| t.tag)
        } else {
            None
        };

        let issues = match parsed.as_ref().filter(|b| b.kind().is_flow()) {
            Some(branch) => self.readiness_issues(branch, &dirty_paths, sync.as_ref())?,
            None => Vec::new(),
        };

        Ok(FlowStatus {
            state: parsed
                .as_ref()
                .map(|b| FlowState::of(b.kind()))
                .unwrap_or(FlowState::NoActiveFlowBranch),
            kind: parsed.as_ref().map(|b| b.kind()),
            current_branch: current,
            clean: dirty_paths.is_empty(),
            dirty_paths,
            sync,
            branches,
            latest_tag,
            issues,
        })
    }

    fn readiness_issues(
        &self,
        branch: &Branch,
        dirty_paths: &[String],
        sync: Option<&SyncStatus>,
    ) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if !dirty_paths.is_empty() {
            issues.push(format!("{} uncommitted change(s)", dirty_paths.len()));
        }
        if let Some(sync) = sync.filter(|s| s.behind > 0) {
            issues.push(format!("{} commit(s) behind upstream", sync.behind));
        }
        if let Some(base) = branch.base() {
            if self.repo.merge_base(branch.name(), base)?.is_none() {
                issues.push(format!("no common history with {}", base));
            }
        }
        for target in branch.merge_targets() {
            if !self.repo.branch_exists(target, None)? {
                issues.push(format!("{} does not exist", target));
                continue;
            }
            let paths = self.repo.test_merge(branch.name(), target)?;
            if !paths.is_empty() {
                issues.push(format!("conflicts with {}: {}", target, paths.join(", ")));
            }
        }
        if branch.kind().is_tagged() {
            let version = self.finish_version(branch)?;
            if let Err(e) = self.ensure_newer_than_tags(&version) {
                issues.push(e.to_string());
            }
        }

        Ok(issues)
    }
}
