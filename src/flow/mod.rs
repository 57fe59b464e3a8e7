//! Branch lifecycle manager
//!
//! Creation and completion of feature, release and hotfix branches. Every
//! transition checks all of its preconditions before the first mutation, so a
//! rejected transition leaves the repository as it was. The one exception is
//! a release or hotfix whose develop merge fails after main was merged and
//! tagged; that state is reported as `DevelopMergeIncomplete`.

pub mod checks;
pub mod status;

pub use checks::{CheckContext, CheckRunner, CommandChecks, NoChecks};
pub use status::FlowStatus;

use crate::analyzer::{tags, VersionAdvice, VersionAdvisor};
use crate::config::Config;
use crate::domain::{Branch, BranchKind, Version, VersionBump};
use crate::error::{GitFlowError, Result};
use crate::git::Repository;
use crate::guard::{Guard, MutationOrigin, Operation};
use serde::Serialize;

/// Lifecycle state, derived from the checked out branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowState {
    NoActiveFlowBranch,
    FeatureActive,
    ReleaseActive,
    HotfixActive,
}

impl FlowState {
    fn of(kind: BranchKind) -> Self {
        match kind {
            BranchKind::Feature => FlowState::FeatureActive,
            BranchKind::Release => FlowState::ReleaseActive,
            BranchKind::Hotfix => FlowState::HotfixActive,
            BranchKind::Main | BranchKind::Develop => FlowState::NoActiveFlowBranch,
        }
    }
}

/// A flow branch that was created and checked out
#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub branch: String,
    pub kind: BranchKind,
    pub base: String,
    pub upstream: String,
    pub version: Option<Version>,
    /// Advice the version was derived from, when it was not given explicitly
    pub advice: Option<VersionAdvice>,
}

/// One recorded merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRecord {
    pub target: String,
    pub commit: String,
}

/// A finished flow branch
#[derive(Debug, Clone, Serialize)]
pub struct FinishReport {
    pub branch: String,
    pub kind: BranchKind,
    pub merges: Vec<MergeRecord>,
    pub tag: Option<String>,
    pub deleted: bool,
    /// Branch checked out afterwards
    pub current_branch: String,
}

/// An abandoned flow branch
#[derive(Debug, Clone, Serialize)]
pub struct AbandonReport {
    pub branch: String,
    pub returned_to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOptions {
    pub delete_branch: bool,
    pub run_checks: bool,
}

impl FinishOptions {
    pub fn from_config(config: &Config) -> Self {
        FinishOptions {
            delete_branch: config.behavior.delete_branch_after_finish,
            run_checks: true,
        }
    }
}

/// Drives flow transitions against a repository.
///
/// The manager is the only component that asks the repository to mutate.
pub struct FlowManager<R: Repository> {
    repo: R,
    config: Config,
    advisor: VersionAdvisor,
    guard: Guard,
    checks: Box<dyn CheckRunner>,
}

impl<R: Repository> FlowManager<R> {
    /// Create a manager running the configured finish checks from the
    /// process working directory.
    pub fn new(repo: R, config: Config) -> Result<Self> {
        let checks: Box<dyn CheckRunner> = if config.behavior.finish_checks.is_empty() {
            Box::new(NoChecks)
        } else {
            Box::new(CommandChecks::new(config.behavior.finish_checks.clone()))
        };
        Ok(FlowManager {
            advisor: VersionAdvisor::new(&config)?,
            guard: Guard::new(&config),
            repo,
            config,
            checks,
        })
    }

    pub fn with_checks(mut self, checks: Box<dyn CheckRunner>) -> Self {
        self.checks = checks;
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn advisor(&self) -> &VersionAdvisor {
        &self.advisor
    }

    pub fn into_inner(self) -> R {
        self.repo
    }

    /// Current lifecycle state. Unparsable branch names count as no flow branch.
    pub fn state(&self) -> Result<FlowState> {
        let current = self.repo.current_branch()?;
        Ok(Branch::parse(&current, &self.config.branches)
            .map(|b| FlowState::of(b.kind()))
            .unwrap_or(FlowState::NoActiveFlowBranch))
    }

    /// Create `feature/<name>` from develop and check it out.
    pub fn create_feature(&mut self, name: &str) -> Result<CreateReport> {
        let branch = Branch::compose(BranchKind::Feature, name, &self.config.branches)?;
        self.ensure_clean()?;
        let base = self.config.branches.develop.clone();
        self.ensure_base_ready(&base)?;
        self.ensure_absent(branch.name())?;
        self.start(&branch, &base, None, None)
    }

    /// Create `release/v<version>` from develop.
    ///
    /// Without an explicit version the advisor decides over develop; a
    /// history that warrants no bump is refused.
    pub fn create_release(&mut self, version: Option<Version>) -> Result<CreateReport> {
        self.ensure_clean()?;
        let base = self.config.branches.develop.clone();
        self.ensure_base_ready(&base)?;

        let (version, advice) = match version {
            Some(version) => (version, None),
            None => {
                let history = self.advisor.history(&self.repo, &base, None)?;
                let advice = self.advisor.advise(&history);
                match advice.suggested_version.clone() {
                    Some(version) => (version, Some(advice)),
                    None => return Err(GitFlowError::NoReleaseWarranted(advice.reason)),
                }
            }
        };

        self.ensure_newer_than_tags(&version)?;
        let token = format!("v{}", version);
        let branch = Branch::compose(BranchKind::Release, &token, &self.config.branches)?;
        self.ensure_absent(branch.name())?;
        self.start(&branch, &base, Some(version), advice)
    }

    /// Create a hotfix branch from main.
    ///
    /// The branch is `hotfix/<name>` when a name is given and
    /// `hotfix/v<version>` otherwise; the version defaults to a patch bump of
    /// the latest tag reachable from main.
    pub fn create_hotfix(
        &mut self,
        name: Option<&str>,
        version: Option<Version>,
    ) -> Result<CreateReport> {
        if name.is_some() && version.is_some() {
            return Err(GitFlowError::version(
                "Give either a hotfix name or a version, not both",
            ));
        }
        self.ensure_clean()?;
        let base = self.config.branches.main.clone();
        self.ensure_base_ready(&base)?;

        let version = match version {
            Some(version) => version,
            None => self.next_patch(&base)?,
        };
        self.ensure_newer_than_tags(&version)?;

        let token = match name {
            Some(name) => name.to_string(),
            None => format!("v{}", version),
        };
        let branch = Branch::compose(BranchKind::Hotfix, &token, &self.config.branches)?;
        self.ensure_absent(branch.name())?;
        self.start(&branch, &base, Some(version), None)
    }

    /// Finish the checked out flow branch.
    ///
    /// All preconditions are checked first: clean tree, shared history with
    /// the base, passing checks, conflict-free dry-run merges into every
    /// target and, for tagged kinds, an unused tag newer than every other.
    pub fn finish(&mut self, options: FinishOptions) -> Result<FinishReport> {
        let branch = self.current_flow_branch()?;
        self.ensure_clean()?;

        let base = branch
            .base()
            .unwrap_or(self.config.branches.develop.as_str())
            .to_string();
        for target in branch.merge_targets() {
            if !self.repo.branch_exists(target, None)? {
                return Err(GitFlowError::branch_not_found(target.as_str()));
            }
        }
        if self.repo.merge_base(branch.name(), &base)?.is_none() {
            return Err(GitFlowError::WrongBaseBranch {
                branch: branch.name().to_string(),
                expected: base,
            });
        }

        let version = if branch.kind().is_tagged() {
            Some(self.finish_version(&branch)?)
        } else {
            None
        };

        if options.run_checks {
            self.checks.run(&CheckContext {
                branch: branch.name().to_string(),
                kind: branch.kind(),
                version: version.clone(),
            })?;
            // checks may touch the working tree
            self.ensure_clean()?;
        }

        for target in branch.merge_targets() {
            let paths = self.repo.test_merge(branch.name(), target)?;
            if !paths.is_empty() {
                return Err(GitFlowError::MergeConflict {
                    branch: branch.name().to_string(),
                    target: target.clone(),
                    paths,
                });
            }
        }

        let tag = match &version {
            Some(version) => {
                let tag = self.advisor.pattern().format(version);
                self.ensure_newer_than_tags(version)?;
                if self.repo.list_tags()?.contains(&tag) {
                    return Err(GitFlowError::tag(format!("Tag '{}' already exists", tag)));
                }
                Some(tag)
            }
            None => None,
        };

        for target in branch.merge_targets() {
            let verdict = self
                .guard
                .check_protected(target, Operation::Merge, MutationOrigin::FlowFinish);
            if !verdict.allowed {
                return Err(GitFlowError::ProtectedBranchViolation {
                    branch: target.clone(),
                    operation: Operation::Merge.to_string(),
                });
            }
        }

        let merges = match &tag {
            Some(tag) => self.merge_tagged(&branch, tag)?,
            None => self.merge_feature(&branch)?,
        };

        let develop = self.config.branches.develop.clone();
        self.repo.checkout(&develop)?;
        if options.delete_branch {
            self.repo.delete_branch(branch.name())?;
        }
        tracing::info!(branch = %branch, tag = ?tag, "finished branch");

        Ok(FinishReport {
            branch: branch.name().to_string(),
            kind: branch.kind(),
            merges,
            tag,
            deleted: options.delete_branch,
            current_branch: develop,
        })
    }

    /// Return to the base branch and delete the checked out flow branch
    /// without merging it.
    pub fn abandon(&mut self) -> Result<AbandonReport> {
        let branch = self.current_flow_branch()?;
        self.ensure_clean()?;
        let base = branch
            .base()
            .unwrap_or(self.config.branches.develop.as_str())
            .to_string();

        self.repo.checkout(&base)?;
        self.repo.delete_branch(branch.name())?;
        tracing::info!(branch = %branch, base = %base, "abandoned branch");

        Ok(AbandonReport {
            branch: branch.name().to_string(),
            returned_to: base,
        })
    }

    fn merge_feature(&mut self, branch: &Branch) -> Result<Vec<MergeRecord>> {
        let develop = self.config.branches.develop.clone();
        let message = format!("Merge {} into {}", branch, develop);
        let commit = self.repo.merge_no_ff(branch.name(), &develop, &message)?;
        Ok(vec![MergeRecord {
            target: develop,
            commit,
        }])
    }

    /// Merge into main, tag the merge commit, then merge into develop.
    fn merge_tagged(&mut self, branch: &Branch, tag: &str) -> Result<Vec<MergeRecord>> {
        let main = self.config.branches.main.clone();
        let develop = self.config.branches.develop.clone();
        let label = match branch.kind() {
            BranchKind::Hotfix => "Hotfix",
            _ => "Release",
        };

        let message = format!("Merge {} into {} - {} {}", branch, main, label, tag);
        let main_commit = self.repo.merge_no_ff(branch.name(), &main, &message)?;
        self.repo
            .create_tag(tag, &format!("{} {}", label, tag), &main)?;
        tracing::info!(tag, commit = %main_commit, "tagged main");

        let message = format!("Merge {} into {}", branch, develop);
        let develop_commit = match self.repo.merge_no_ff(branch.name(), &develop, &message) {
            Ok(commit) => commit,
            Err(GitFlowError::MergeConflict { paths, .. }) => {
                tracing::error!(branch = %branch, tag, "develop merge failed after tagging");
                return Err(GitFlowError::DevelopMergeIncomplete {
                    branch: branch.name().to_string(),
                    tag: tag.to_string(),
                    paths,
                });
            }
            Err(e) => return Err(e),
        };

        Ok(vec![
            MergeRecord {
                target: main,
                commit: main_commit,
            },
            MergeRecord {
                target: develop,
                commit: develop_commit,
            },
        ])
    }

    fn start(
        &mut self,
        branch: &Branch,
        base: &str,
        version: Option<Version>,
        advice: Option<VersionAdvice>,
    ) -> Result<CreateReport> {
        let remote = self.config.behavior.remote.clone();
        self.repo.create_branch(branch.name(), base)?;
        self.repo.checkout(branch.name())?;
        self.repo.set_upstream(branch.name(), &remote)?;
        tracing::info!(branch = %branch, base, "created branch");

        Ok(CreateReport {
            branch: branch.name().to_string(),
            kind: branch.kind(),
            base: base.to_string(),
            upstream: format!("{}/{}", remote, branch),
            version,
            advice,
        })
    }

    fn current_flow_branch(&self) -> Result<Branch> {
        let current = self.repo.current_branch()?;
        match Branch::parse(&current, &self.config.branches) {
            Ok(branch) if branch.kind().is_flow() => Ok(branch),
            _ => Err(GitFlowError::NotOnFlowBranch(current)),
        }
    }

    fn ensure_clean(&self) -> Result<()> {
        let paths = self.repo.dirty_paths()?;
        if paths.is_empty() {
            Ok(())
        } else {
            Err(GitFlowError::DirtyWorkingTree { paths })
        }
    }

    fn ensure_base_ready(&self, base: &str) -> Result<()> {
        if !self.repo.branch_exists(base, None)? {
            return Err(GitFlowError::branch_not_found(base));
        }
        let sync = self.repo.upstream_status(base)?;
        if sync.behind > 0 {
            return Err(GitFlowError::BranchBehindUpstream {
                branch: base.to_string(),
                behind: sync.behind,
            });
        }
        Ok(())
    }

    fn ensure_absent(&self, name: &str) -> Result<()> {
        if self
            .repo
            .branch_exists(name, Some(self.config.behavior.remote.as_str()))?
        {
            return Err(GitFlowError::BranchAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    fn ensure_newer_than_tags(&self, version: &Version) -> Result<()> {
        if let Some(highest) = tags::highest(&self.repo, self.advisor.pattern())? {
            if *version <= highest.version {
                return Err(GitFlowError::version(format!(
                    "{} is not greater than the latest tag {}",
                    version, highest.tag
                )));
            }
        }
        Ok(())
    }

    fn next_patch(&self, reference: &str) -> Result<Version> {
        let (latest, _) = tags::latest_integrated(&self.repo, reference, self.advisor.pattern())?;
        latest
            .map(|t| t.version)
            .unwrap_or_else(Version::baseline)
            .bump(VersionBump::Patch)
    }

    /// Release versions come from the name; hotfixes fall back to a patch
    /// bump of main.
    fn finish_version(&self, branch: &Branch) -> Result<Version> {
        match branch.version() {
            Some(version) => Ok(version.clone()),
            None => self.next_patch(&self.config.branches.main),
        }
    }
}
