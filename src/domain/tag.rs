use crate::domain::Version;
use crate::error::{GitFlowError, Result};
use regex::Regex;

/// Tag naming pattern (e.g., "v{version}", "release-{version}")
#[derive(Debug, Clone)]
pub struct TagPattern {
    pattern: String,
    matcher: Regex,
}

impl TagPattern {
    /// Compile a tag pattern. The pattern must contain a `{version}` placeholder.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{version}") {
            return Err(GitFlowError::tag(format!(
                "Pattern '{}' must contain {{version}} placeholder",
                pattern
            )));
        }

        // Escape everything, then open a capture where the placeholder was
        let escaped = regex::escape(&pattern);
        let regex_pattern = escaped.replace(r"\{version\}", r"(?P<version>\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)");
        let matcher = Regex::new(&format!("^{}$", regex_pattern))
            .map_err(|e| GitFlowError::tag(format!("Invalid pattern '{}': {}", pattern, e)))?;

        Ok(TagPattern { pattern, matcher })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Format a version according to pattern
    /// Example: pattern="v{version}", version=1.2.3 -> "v1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.pattern.replace("{version}", &version.to_string())
    }

    /// Validate if a tag matches this pattern
    pub fn matches(&self, tag: &str) -> bool {
        self.matcher.is_match(tag)
    }

    /// Extract the version from a tag name following this pattern.
    ///
    /// Returns `None` when the tag does not follow the pattern at all and
    /// `Some(Err(_))` when it does but the version part is not valid semver.
    pub fn parse(&self, tag: &str) -> Option<Result<Version>> {
        let captures = self.matcher.captures(tag)?;
        let version = captures.name("version")?.as_str();
        Some(Version::parse(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_format() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert_eq!(pattern.format(&Version::new(1, 2, 3)), "v1.2.3");
    }

    #[test]
    fn test_pattern_format_with_suffix() {
        let pattern = TagPattern::new("release-{version}").unwrap();
        assert_eq!(pattern.format(&Version::new(1, 2, 3)), "release-1.2.3");
    }

    #[test]
    fn test_pattern_matches() {
        let pattern = TagPattern::new("v{version}").unwrap();
        assert!(pattern.matches("v1.2.3"));
        assert!(pattern.matches("v1.2.3-rc.1"));
        assert!(!pattern.matches("release-1.2.3"));
        assert!(!pattern.matches("v1.2"));
    }

    #[test]
    fn test_pattern_parse() {
        let pattern = TagPattern::new("v{version}").unwrap();
        let version = pattern.parse("v2.3.1").unwrap().unwrap();
        assert_eq!(version, Version::new(2, 3, 1));
        assert!(pattern.parse("nightly").is_none());
    }

    #[test]
    fn test_pattern_parse_rejects_leading_zero() {
        let pattern = TagPattern::new("v{version}").unwrap();
        let parsed = pattern.parse("v01.2.3").unwrap();
        assert!(parsed.is_err());
    }

    #[test]
    fn test_pattern_without_placeholder() {
        assert!(TagPattern::new("v1").is_err());
    }
}
