use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of conventional commit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Chore,
    Ci,
    Build,
    Revert,
}

impl CommitType {
    pub const ALL: [CommitType; 11] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Perf,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Ci,
        CommitType::Build,
        CommitType::Revert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Ci => "ci",
            CommitType::Build => "build",
            CommitType::Revert => "revert",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    /// Case-sensitive: `Feat` is not a commit type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown commit type '{}'", s))
    }
}

/// Grouping used by the version advisor and the changelog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Breaking,
    Features,
    Fixes,
    Other,
}

impl Category {
    /// Heading used for changelog subsections
    pub fn title(&self) -> &'static str {
        match self {
            Category::Breaking => "Breaking Changes",
            Category::Features => "Features",
            Category::Fixes => "Fixes",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A validated conventional commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub subject: String,
    pub body: Option<String>,
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub description: String,
    pub is_breaking: bool,
    /// Commit time, seconds since the Unix epoch
    pub timestamp: i64,
}

impl CommitRecord {
    /// Category for version advice: breaking changes dominate the type
    pub fn category(&self) -> Category {
        if self.is_breaking {
            Category::Breaking
        } else {
            self.type_category()
        }
    }

    /// Category derived from the type alone, as used for changelog grouping
    pub fn type_category(&self) -> Category {
        match self.commit_type {
            CommitType::Feat => Category::Features,
            CommitType::Fix => Category::Fixes,
            _ => Category::Other,
        }
    }

    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(commit_type: CommitType, is_breaking: bool) -> CommitRecord {
        CommitRecord {
            hash: "0123456789abcdef".to_string(),
            subject: String::new(),
            body: None,
            commit_type,
            scope: None,
            description: "x".to_string(),
            is_breaking,
            timestamp: 0,
        }
    }

    #[test]
    fn test_commit_type_from_str() {
        assert_eq!("feat".parse::<CommitType>().unwrap(), CommitType::Feat);
        assert_eq!("revert".parse::<CommitType>().unwrap(), CommitType::Revert);
        assert!("Feat".parse::<CommitType>().is_err());
        assert!("feature".parse::<CommitType>().is_err());
    }

    #[test]
    fn test_all_types_round_trip_names() {
        for t in CommitType::ALL {
            assert_eq!(t.as_str().parse::<CommitType>().unwrap(), t);
        }
    }

    #[test]
    fn test_category() {
        assert_eq!(record(CommitType::Feat, false).category(), Category::Features);
        assert_eq!(record(CommitType::Fix, false).category(), Category::Fixes);
        assert_eq!(record(CommitType::Docs, false).category(), Category::Other);
        assert_eq!(record(CommitType::Fix, true).category(), Category::Breaking);
        assert_eq!(record(CommitType::Fix, true).type_category(), Category::Fixes);
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(record(CommitType::Feat, false).short_hash(), "0123456");
        let mut short = record(CommitType::Feat, false);
        short.hash = "abc".to_string();
        assert_eq!(short.short_hash(), "abc");
    }
}
