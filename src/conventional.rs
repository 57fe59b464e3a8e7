//! Commit message grammar and validation.
//!
//! A message is accepted when its subject reads `type[(scope)][!]: description`
//! and every rule in [`Rule`] holds. Validation is total: any input, including
//! an empty string, yields either a [`CommitRecord`] or a [`CommitViolation`].

use crate::config::CommitsConfig;
use crate::domain::{CommitRecord, CommitType};
use crate::error::GitFlowError;
use crate::git::RawCommit;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>\w+)(?:\((?P<scope>[^()]+)\))?(?P<bang>!)?:(?P<sep>\s*)(?P<desc>.*)$").unwrap()
});

/// Line git places above the diff in verbose commit templates
const SCISSORS: &str = "# ------------------------ >8 ------------------------";

/// The rule a rejected message broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    Empty,
    SubjectTooLong,
    Grammar,
    UnknownType,
    EmptyDescription,
    UppercaseDescription,
    TrailingPeriod,
    MissingBlankLine,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Empty => "empty",
            Rule::SubjectTooLong => "subject-too-long",
            Rule::Grammar => "grammar",
            Rule::UnknownType => "unknown-type",
            Rule::EmptyDescription => "empty-description",
            Rule::UppercaseDescription => "uppercase-description",
            Rule::TrailingPeriod => "trailing-period",
            Rule::MissingBlankLine => "missing-blank-line",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected commit message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitViolation {
    pub rule: Rule,
    /// The offending text (usually the subject line)
    pub text: String,
    pub message: String,
}

impl fmt::Display for CommitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.rule)
    }
}

impl From<CommitViolation> for GitFlowError {
    fn from(v: CommitViolation) -> Self {
        GitFlowError::InvalidCommitFormat {
            rule: v.rule.to_string(),
            text: v.text,
        }
    }
}

/// Validates commit messages against the configured grammar
#[derive(Debug, Clone)]
pub struct CommitValidator {
    types: Vec<CommitType>,
    max_subject_length: usize,
    breaking_indicators: Vec<String>,
}

impl CommitValidator {
    pub fn new(config: &CommitsConfig) -> Self {
        CommitValidator {
            types: config.types.clone(),
            max_subject_length: config.max_subject_length,
            breaking_indicators: config.breaking_change_indicators.clone(),
        }
    }

    pub fn allowed_types(&self) -> &[CommitType] {
        &self.types
    }

    /// Validate a message and return the structured record.
    ///
    /// The returned record has an empty hash and a zero timestamp; use
    /// [`CommitValidator::classify`] for commits read from a repository.
    pub fn validate(&self, message: &str) -> Result<CommitRecord, CommitViolation> {
        let message = message.trim();
        if message.is_empty() {
            return Err(violation(Rule::Empty, "", "Empty commit message".to_string()));
        }

        let mut lines = message.lines();
        let subject = lines.next().unwrap_or_default().trim_end();

        let length = subject.chars().count();
        if length > self.max_subject_length {
            return Err(violation(
                Rule::SubjectTooLong,
                subject,
                format!(
                    "Subject line too long ({} > {} characters)",
                    length, self.max_subject_length
                ),
            ));
        }

        let captures = SUBJECT.captures(subject).ok_or_else(|| {
            violation(
                Rule::Grammar,
                subject,
                "Does not follow the format <type>(<scope>): <description>".to_string(),
            )
        })?;

        let type_name = &captures["type"];
        let commit_type = type_name
            .parse::<CommitType>()
            .ok()
            .filter(|t| self.types.contains(t))
            .ok_or_else(|| {
                violation(
                    Rule::UnknownType,
                    subject,
                    format!(
                        "Invalid type '{}'. Must be one of: {}",
                        type_name,
                        self.type_list()
                    ),
                )
            })?;

        let description = captures["desc"].trim();
        if description.is_empty() {
            return Err(violation(
                Rule::EmptyDescription,
                subject,
                "Description must not be empty".to_string(),
            ));
        }
        if captures["sep"].is_empty() {
            return Err(violation(
                Rule::Grammar,
                subject,
                "Expected a space after ':'".to_string(),
            ));
        }
        if description.chars().next().is_some_and(char::is_uppercase) {
            return Err(violation(
                Rule::UppercaseDescription,
                subject,
                "Description should start with a lowercase letter".to_string(),
            ));
        }
        if description.ends_with('.') {
            return Err(violation(
                Rule::TrailingPeriod,
                subject,
                "Description should not end with a period".to_string(),
            ));
        }

        let rest: Vec<&str> = lines.collect();
        if let Some(second) = rest.first() {
            if !second.trim().is_empty() {
                return Err(violation(
                    Rule::MissingBlankLine,
                    subject,
                    "Missing blank line between subject and body".to_string(),
                ));
            }
        }

        let body = rest.join("\n").trim().to_string();
        let has_footer = body.lines().any(|line| {
            self.breaking_indicators
                .iter()
                .any(|indicator| line.starts_with(indicator.as_str()))
        });

        Ok(CommitRecord {
            hash: String::new(),
            subject: subject.to_string(),
            body: (!body.is_empty()).then_some(body),
            commit_type,
            scope: captures.name("scope").map(|m| m.as_str().to_string()),
            description: description.to_string(),
            is_breaking: captures.name("bang").is_some() || has_footer,
            timestamp: 0,
        })
    }

    /// Validate a commit read from a repository, keeping its hash and time.
    pub fn classify(&self, commit: &RawCommit) -> Result<CommitRecord, CommitViolation> {
        let mut record = self.validate(&commit.message)?;
        record.hash = commit.hash.clone();
        record.timestamp = commit.timestamp;
        Ok(record)
    }

    fn type_list(&self) -> String {
        self.types
            .iter()
            .map(CommitType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn violation(rule: Rule, text: &str, message: String) -> CommitViolation {
    CommitViolation {
        rule,
        text: text.to_string(),
        message,
    }
}

/// Strip the comment lines git leaves in a commit message file.
///
/// Everything below the verbose-mode scissors line is dropped as well.
pub fn strip_comments(raw: &str) -> String {
    raw.lines()
        .take_while(|line| *line != SCISSORS)
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> CommitValidator {
        CommitValidator::new(&CommitsConfig::default())
    }

    fn rule_of(message: &str) -> Rule {
        validator().validate(message).unwrap_err().rule
    }

    #[test]
    fn test_simple_subject() {
        let record = validator().validate("feat: add login").unwrap();
        assert_eq!(record.commit_type, CommitType::Feat);
        assert_eq!(record.description, "add login");
        assert_eq!(record.scope, None);
        assert!(!record.is_breaking);
        assert_eq!(record.body, None);
    }

    #[test]
    fn test_scope_and_bang() {
        let record = validator().validate("fix(auth)!: critical auth bypass").unwrap();
        assert_eq!(record.commit_type, CommitType::Fix);
        assert_eq!(record.scope.as_deref(), Some("auth"));
        assert!(record.is_breaking);
    }

    #[test]
    fn test_breaking_footer() {
        let message = "refactor: drop legacy api\n\nremoves v1 endpoints\n\nBREAKING CHANGE: clients must migrate";
        let record = validator().validate(message).unwrap();
        assert!(record.is_breaking);
        assert!(record.body.unwrap().contains("removes v1 endpoints"));

        let hyphen = "feat: new auth\n\nBREAKING-CHANGE: tokens rotate";
        assert!(validator().validate(hyphen).unwrap().is_breaking);
    }

    #[test]
    fn test_footer_token_mid_line_is_not_breaking() {
        let message = "docs: explain flags\n\nmentions BREAKING CHANGE: in prose";
        assert!(!validator().validate(message).unwrap().is_breaking);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(rule_of(""), Rule::Empty);
        assert_eq!(rule_of("   \n\t\n"), Rule::Empty);
    }

    #[test]
    fn test_grammar_violations() {
        assert_eq!(rule_of("Update README"), Rule::Grammar);
        assert_eq!(rule_of("feat:no space"), Rule::Grammar);
        assert_eq!(rule_of("feat(): empty scope"), Rule::Grammar);
        assert_eq!(rule_of("feat(a)(b): two scopes"), Rule::Grammar);
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(rule_of("feature: add login"), Rule::UnknownType);
        assert_eq!(rule_of("Feat: add login"), Rule::UnknownType);
    }

    #[test]
    fn test_restricted_types() {
        let config = CommitsConfig {
            types: vec![CommitType::Feat, CommitType::Fix],
            ..CommitsConfig::default()
        };
        let validator = CommitValidator::new(&config);
        let err = validator.validate("chore: bump deps").unwrap_err();
        assert_eq!(err.rule, Rule::UnknownType);
        assert!(err.message.contains("feat, fix"));
    }

    #[test]
    fn test_description_rules() {
        assert_eq!(rule_of("feat:    "), Rule::EmptyDescription);
        assert_eq!(rule_of("feat:"), Rule::EmptyDescription);
        assert_eq!(rule_of("feat: Add login"), Rule::UppercaseDescription);
        assert_eq!(rule_of("feat: add login."), Rule::TrailingPeriod);
    }

    #[test]
    fn test_subject_length() {
        let at_limit = format!("feat: {}", "a".repeat(66));
        assert_eq!(at_limit.len(), 72);
        assert!(validator().validate(&at_limit).is_ok());

        let over = format!("feat: {}", "a".repeat(67));
        let err = validator().validate(&over).unwrap_err();
        assert_eq!(err.rule, Rule::SubjectTooLong);
        assert!(err.message.contains("73 > 72"));
    }

    #[test]
    fn test_missing_blank_line() {
        assert_eq!(rule_of("feat: add login\nbody text"), Rule::MissingBlankLine);
        assert!(validator().validate("feat: add login\n\nbody text").is_ok());
    }

    #[test]
    fn test_violation_names_offending_text() {
        let err = validator().validate("oops: Bad.").unwrap_err();
        assert_eq!(err.text, "oops: Bad.");
        let gf: GitFlowError = err.into();
        assert!(matches!(gf, GitFlowError::InvalidCommitFormat { .. }));
    }

    #[test]
    fn test_classify_keeps_hash() {
        let raw = RawCommit {
            hash: "abc1234def".to_string(),
            message: "fix: null check".to_string(),
            timestamp: 1_700_000_000,
            is_merge: false,
        };
        let record = validator().classify(&raw).unwrap();
        assert_eq!(record.hash, "abc1234def");
        assert_eq!(record.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_strip_comments() {
        let raw = "feat: add login\n# Please enter the commit message\n\nbody\n# ------------------------ >8 ------------------------\ndiff --git a b";
        assert_eq!(strip_comments(raw), "feat: add login\n\nbody");
    }

    #[test]
    fn test_unicode_does_not_panic() {
        let _ = validator().validate("feat: ñandú ünïcödé 🚀");
        let _ = validator().validate("🚀");
        let _ = validator().validate(&"é".repeat(200));
    }
}
