use crate::error::{GitFlowError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
///
/// Field order matters: the derived ordering compares major, minor and patch
/// numerically and then the pre-release label, where `semver::Prerelease`
/// already ranks an empty label above any non-empty one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: semver::Prerelease,
}

impl Version {
    /// Create a new release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: semver::Prerelease::EMPTY,
        }
    }

    /// The 0.0.0 baseline used when a repository has no version tags
    pub fn baseline() -> Self {
        Version::new(0, 0, 0)
    }

    /// Parse a version, accepting an optional `v`/`V` prefix
    /// ("v1.2.3" -> Version(1,2,3), "1.0.0-rc.1" -> Version(1,0,0,rc.1)).
    ///
    /// Build metadata is rejected: it carries no precedence and has no place in
    /// a release branch or tag name.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let clean = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);

        let parsed = semver::Version::parse(clean).map_err(|e| {
            GitFlowError::version(format!(
                "Invalid version format: '{}' - expected X.Y.Z ({})",
                text, e
            ))
        })?;

        if !parsed.build.is_empty() {
            return Err(GitFlowError::version(format!(
                "Build metadata is not allowed in '{}'",
                text
            )));
        }

        Ok(Version {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre: parsed.pre,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Bump version according to bump type.
    ///
    /// A higher component resets the lower ones and any pre-release label is
    /// dropped. `VersionBump::None` returns the version unchanged. Fails when
    /// the bumped component would overflow.
    pub fn bump(&self, bump_type: VersionBump) -> Result<Self> {
        let next = |n: u64| {
            n.checked_add(1).ok_or_else(|| {
                GitFlowError::version(format!("Cannot apply {} bump to {}: overflow", bump_type, self))
            })
        };
        Ok(match bump_type {
            VersionBump::Major => Version::new(next(self.major)?, 0, 0),
            VersionBump::Minor => Version::new(self.major, next(self.minor)?, 0),
            VersionBump::Patch => Version::new(self.major, self.minor, next(self.patch)?),
            VersionBump::None => self.clone(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = GitFlowError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Version bump type decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionBump {
    None,
    Patch,
    Minor,
    Major,
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionBump::Major => "MAJOR",
            VersionBump::Minor => "MINOR",
            VersionBump::Patch => "PATCH",
            VersionBump::None => "NONE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = Version::parse("v1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert!(!v.is_prerelease());
    }

    #[test]
    fn test_version_parse_without_v() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("V1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_version_parse_prerelease() {
        let v = Version::parse("v2.0.0-rc.1").unwrap();
        assert!(v.is_prerelease());
        assert_eq!(v.to_string(), "2.0.0-rc.1");
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("v1.2.3.4").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.2.3+build.5").is_err());
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        let rc = Version::parse("1.0.0-rc.1").unwrap();
        let release = Version::new(1, 0, 0);
        assert!(rc < release);
        assert!(Version::new(0, 9, 9) < rc);
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(Version::new(1, 10, 0) > Version::new(1, 9, 0));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }

    #[test]
    fn test_version_bump() {
        let v = Version::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Major).unwrap(), Version::new(2, 0, 0));
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(1, 3, 0));
        assert_eq!(v.bump(VersionBump::Patch).unwrap(), Version::new(1, 2, 4));
        assert_eq!(v.bump(VersionBump::None).unwrap(), v);
    }

    #[test]
    fn test_bump_overflow_is_error() {
        let v = Version::parse("v18446744073709551615.0.0").unwrap();
        assert!(v.bump(VersionBump::Major).is_err());
        assert_eq!(v.bump(VersionBump::Minor).unwrap(), Version::new(u64::MAX, 1, 0));

        let v = Version::new(1, 2, u64::MAX);
        assert!(v.bump(VersionBump::Patch).is_err());
        assert_eq!(v.bump(VersionBump::None).unwrap(), v);
    }

    #[test]
    fn test_bump_drops_prerelease() {
        let v = Version::parse("1.2.3-beta.2").unwrap();
        let bumped = v.bump(VersionBump::Patch).unwrap();
        assert_eq!(bumped, Version::new(1, 2, 4));
        assert!(!bumped.is_prerelease());
    }

    #[test]
    fn test_bump_is_monotone() {
        let base = Version::new(3, 4, 5);
        for bump in [VersionBump::Patch, VersionBump::Minor, VersionBump::Major] {
            assert!(base.bump(bump).unwrap() > base, "{} did not increase", bump);
        }
    }

    #[test]
    fn test_bump_ordering() {
        assert!(VersionBump::Major > VersionBump::Minor);
        assert!(VersionBump::Minor > VersionBump::Patch);
        assert!(VersionBump::Patch > VersionBump::None);
    }

    #[test]
    fn test_version_serializes_as_string() {
        let json = serde_json::to_string(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(json, "\"1.1.0\"");
        assert_eq!(
            serde_json::to_string(&VersionBump::Minor).unwrap(),
            "\"MINOR\""
        );
    }
}
