use crate::analyzer::tags::{self, TaggedVersion};
use crate::boundary::BoundaryWarning;
use crate::config::{Config, NoBumpPolicy};
use crate::conventional::CommitValidator;
use crate::domain::{Category, CommitRecord, CommitType, TagPattern, Version, VersionBump};
use crate::error::{GitFlowError, Result};
use crate::git::{RawCommit, Repository};
use serde::Serialize;
use std::collections::BTreeMap;

/// Subjects listed per category in an advice
pub const MAX_EXEMPLARS: usize = 5;

const CATEGORIES: [Category; 4] = [
    Category::Breaking,
    Category::Features,
    Category::Fixes,
    Category::Other,
];

/// Classified commits on a branch since its baseline tag
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub reference: String,
    pub baseline: Option<TaggedVersion>,
    pub records: Vec<CommitRecord>,
    pub warnings: Vec<BoundaryWarning>,
}

impl History {
    /// Version of the baseline tag, or 0.0.0 without one
    pub fn current_version(&self) -> Version {
        self.baseline
            .as_ref()
            .map(|b| b.version.clone())
            .unwrap_or_else(Version::baseline)
    }
}

/// Suggested next version with the evidence behind it
#[derive(Debug, Clone, Serialize)]
pub struct VersionAdvice {
    pub current_version: Version,
    pub current_tag: Option<String>,
    pub suggested_version: Option<Version>,
    pub suggested_tag: Option<String>,
    pub bump: VersionBump,
    pub reason: String,
    pub counts_by_category: BTreeMap<Category, usize>,
    pub exemplars: BTreeMap<Category, Vec<String>>,
    pub warnings: Vec<BoundaryWarning>,
}

/// Analyzes commits to determine the next version
pub struct VersionAdvisor {
    validator: CommitValidator,
    pattern: TagPattern,
    policy: NoBumpPolicy,
}

impl VersionAdvisor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(VersionAdvisor {
            validator: CommitValidator::new(&config.commits),
            pattern: config.versioning.tag_pattern()?,
            policy: config.versioning.no_bump_policy,
        })
    }

    pub fn pattern(&self) -> &TagPattern {
        &self.pattern
    }

    pub fn validator(&self) -> &CommitValidator {
        &self.validator
    }

    /// Validate raw commits, skipping merges and reporting invalid messages.
    pub fn classify(&self, commits: &[RawCommit]) -> (Vec<CommitRecord>, Vec<BoundaryWarning>) {
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        for commit in commits.iter().filter(|c| !c.is_merge) {
            match self.validator.classify(commit) {
                Ok(record) => {
                    tracing::debug!(
                        hash = %record.short_hash(),
                        category = ?record.category(),
                        "classified commit"
                    );
                    records.push(record);
                }
                Err(violation) => {
                    let warning = BoundaryWarning::UnclassifiedCommit {
                        hash: commit.hash.clone(),
                        subject: commit.message.lines().next().unwrap_or_default().to_string(),
                        reason: violation.message,
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        (records, warnings)
    }

    /// Read and classify the commits on `reference` since its baseline tag.
    ///
    /// The baseline is `from_tag` when given, otherwise the highest version tag
    /// integrated into `reference`; without one every commit counts and the
    /// baseline is 0.0.0.
    pub fn history<R: Repository + ?Sized>(
        &self,
        repo: &R,
        reference: &str,
        from_tag: Option<&str>,
    ) -> Result<History> {
        let (baseline, mut warnings) = match from_tag {
            Some(tag) => {
                let version = self
                    .pattern
                    .parse(tag)
                    .unwrap_or_else(|| {
                        Err(GitFlowError::version(format!(
                            "Tag '{}' does not follow pattern '{}'",
                            tag,
                            self.pattern.as_str()
                        )))
                    })?;
                (
                    Some(TaggedVersion {
                        tag: tag.to_string(),
                        version,
                    }),
                    Vec::new(),
                )
            }
            None => tags::latest_integrated(repo, reference, &self.pattern)?,
        };

        let commits = repo.commits_since(baseline.as_ref().map(|b| b.tag.as_str()), reference)?;
        if let Some(base) = &baseline {
            if commits.iter().all(|c| c.is_merge) {
                warnings.push(BoundaryWarning::NoNewCommits {
                    latest_tag: base.tag.clone(),
                    reference: reference.to_string(),
                });
            }
        }

        let (records, skipped) = self.classify(&commits);
        warnings.extend(skipped);

        Ok(History {
            reference: reference.to_string(),
            baseline,
            records,
            warnings,
        })
    }

    /// Classify-and-reduce: breaking > feat > fix > none
    pub fn decide(records: &[CommitRecord]) -> VersionBump {
        records
            .iter()
            .map(|record| {
                if record.is_breaking {
                    VersionBump::Major
                } else {
                    match record.commit_type {
                        CommitType::Feat => VersionBump::Minor,
                        CommitType::Fix => VersionBump::Patch,
                        _ => VersionBump::None,
                    }
                }
            })
            .max()
            .unwrap_or(VersionBump::None)
    }

    /// Advise on the next version for a classified history.
    pub fn advise(&self, history: &History) -> VersionAdvice {
        let mut advice = self.advise_records(&history.current_version(), &history.records);
        advice.current_tag = history.baseline.as_ref().map(|b| b.tag.clone());
        advice.warnings = history.warnings.clone();
        advice
    }

    /// Advise on the next version from `current` given the classified commits.
    pub fn advise_records(&self, current: &Version, records: &[CommitRecord]) -> VersionAdvice {
        let mut counts: BTreeMap<Category, usize> = CATEGORIES.iter().map(|c| (*c, 0)).collect();
        let mut exemplars: BTreeMap<Category, Vec<String>> = BTreeMap::new();
        for record in records {
            let category = record.category();
            *counts.entry(category).or_default() += 1;
            let list = exemplars.entry(category).or_default();
            if list.len() < MAX_EXEMPLARS {
                list.push(record.subject.clone());
            }
        }

        let decided = Self::decide(records);
        let (bump, mut reason) = match decided {
            VersionBump::Major => (decided, "Breaking changes detected".to_string()),
            VersionBump::Minor => (decided, "New features added".to_string()),
            VersionBump::Patch => (decided, "Bug fixes only".to_string()),
            VersionBump::None if records.is_empty() => (
                VersionBump::None,
                "No new conventional commits".to_string(),
            ),
            VersionBump::None => match self.policy {
                NoBumpPolicy::Refuse => (
                    VersionBump::None,
                    "No version bump needed (only maintenance changes)".to_string(),
                ),
                NoBumpPolicy::Patch => (
                    VersionBump::Patch,
                    "Only maintenance changes; patch bump forced by policy".to_string(),
                ),
            },
        };

        let suggested_version = match current.bump(bump) {
            Ok(next) if bump != VersionBump::None => Some(next),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(%current, %bump, "version bump overflows");
                reason = e.to_string();
                None
            }
        };
        tracing::debug!(%current, %bump, "version advice computed");

        VersionAdvice {
            current_version: current.clone(),
            current_tag: None,
            suggested_tag: suggested_version.as_ref().map(|v| self.pattern.format(v)),
            suggested_version,
            bump,
            reason,
            counts_by_category: counts,
            exemplars,
            warnings: Vec::new(),
        }
    }
}
