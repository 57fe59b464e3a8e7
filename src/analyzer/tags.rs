use crate::boundary::BoundaryWarning;
use crate::domain::{TagPattern, Version};
use crate::error::Result;
use crate::git::Repository;
use serde::Serialize;

/// A tag whose name follows the tag pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedVersion {
    pub tag: String,
    pub version: Version,
}

/// Highest version tag whose history `reference` already contains.
///
/// A tag counts when its commit is reachable from `reference`, or when only
/// merge commits separate the two: a release tagged on main's merge commit is
/// the baseline of develop, which merged the same release branch.
///
/// Tags that do not follow the pattern at all are ignored; tags that follow
/// it with an invalid version are reported as `UnparsableTag`. A missing
/// result comes with a `NoTagsFound` warning.
pub fn latest_integrated<R: Repository + ?Sized>(
    repo: &R,
    reference: &str,
    pattern: &TagPattern,
) -> Result<(Option<TaggedVersion>, Vec<BoundaryWarning>)> {
    let mut warnings = Vec::new();
    let mut candidates = repo.tags_reachable_from(reference)?;
    for tag in repo.list_tags()? {
        if !candidates.contains(&tag) && pattern.matches(&tag) && integrated(repo, &tag, reference)? {
            candidates.push(tag);
        }
    }

    let latest = versions(candidates, pattern, &mut warnings)
        .into_iter()
        .max_by(|a, b| a.version.cmp(&b.version));

    if latest.is_none() {
        warnings.push(BoundaryWarning::NoTagsFound {
            reference: reference.to_string(),
        });
    }
    Ok((latest, warnings))
}

fn integrated<R: Repository + ?Sized>(repo: &R, tag: &str, reference: &str) -> Result<bool> {
    if repo.merge_base(tag, reference)?.is_none() {
        return Ok(false);
    }
    Ok(repo
        .commits_since(Some(reference), tag)?
        .iter()
        .all(|c| c.is_merge))
}

/// Highest version among every tag in the repository
pub fn highest<R: Repository + ?Sized>(
    repo: &R,
    pattern: &TagPattern,
) -> Result<Option<TaggedVersion>> {
    let mut ignored = Vec::new();
    Ok(versions(repo.list_tags()?, pattern, &mut ignored)
        .into_iter()
        .max_by(|a, b| a.version.cmp(&b.version)))
}

fn versions(
    tags: Vec<String>,
    pattern: &TagPattern,
    warnings: &mut Vec<BoundaryWarning>,
) -> Vec<TaggedVersion> {
    tags.into_iter()
        .filter_map(|tag| match pattern.parse(&tag)? {
            Ok(version) => Some(TaggedVersion { tag, version }),
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "ignoring unparsable version tag");
                warnings.push(BoundaryWarning::UnparsableTag {
                    tag,
                    reason: e.to_string(),
                });
                None
            }
        })
        .collect()
}
