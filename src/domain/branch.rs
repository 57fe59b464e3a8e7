use crate::config::BranchesConfig;
use crate::domain::Version;
use crate::error::{GitFlowError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap());

/// Role of a branch in the flow, derived once from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Main,
    Develop,
    Feature,
    Release,
    Hotfix,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Main => "main",
            BranchKind::Develop => "develop",
            BranchKind::Feature => "feature",
            BranchKind::Release => "release",
            BranchKind::Hotfix => "hotfix",
        }
    }

    /// Short-lived branches that are created and finished by the workflow
    pub fn is_flow(&self) -> bool {
        matches!(
            self,
            BranchKind::Feature | BranchKind::Release | BranchKind::Hotfix
        )
    }

    /// Whether finishing this kind produces a version tag on main
    pub fn is_tagged(&self) -> bool {
        matches!(self, BranchKind::Release | BranchKind::Hotfix)
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A branch name that follows the flow naming rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    name: String,
    kind: BranchKind,
    base: Option<String>,
    merge_targets: Vec<String>,
    version: Option<Version>,
}

impl Branch {
    /// Parse and classify a full branch name.
    ///
    /// Accepts exactly the long-lived branch names, `<feature>token`,
    /// `<release>v<semver>` and `<hotfix>token`. Anything else, including
    /// case variants and trailing slashes, is an `InvalidBranchName`.
    pub fn parse(name: &str, config: &BranchesConfig) -> Result<Self> {
        let invalid = |reason: String| GitFlowError::InvalidBranchName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("branch name is empty".to_string()));
        }

        if name == config.main {
            return Ok(Branch::long_lived(name, BranchKind::Main));
        }
        if name == config.develop {
            return Ok(Branch::long_lived(name, BranchKind::Develop));
        }

        if let Some(token) = name.strip_prefix(config.feature_prefix.as_str()) {
            check_token(token, config.max_token_length).map_err(invalid)?;
            return Ok(Branch::flow(name, BranchKind::Feature, None, config));
        }

        if let Some(token) = name.strip_prefix(config.release_prefix.as_str()) {
            let version = token
                .strip_prefix('v')
                .filter(|v| v.starts_with(|c: char| c.is_ascii_digit()))
                .ok_or_else(|| {
                    invalid("release branches are named v<major>.<minor>.<patch>".to_string())
                })
                .and_then(|v| Version::parse(v).map_err(|e| invalid(e.to_string())))?;
            if token.len() > config.max_token_length {
                return Err(invalid(format!(
                    "name exceeds {} characters",
                    config.max_token_length
                )));
            }
            return Ok(Branch::flow(name, BranchKind::Release, Some(version), config));
        }

        if let Some(token) = name.strip_prefix(config.hotfix_prefix.as_str()) {
            check_token(token, config.max_token_length).map_err(invalid)?;
            let version = token.strip_prefix('v').and_then(|v| Version::parse(v).ok());
            return Ok(Branch::flow(name, BranchKind::Hotfix, version, config));
        }

        Err(invalid(format!(
            "expected {}, {}, {}<name>, {}v<version> or {}<name>",
            config.main,
            config.develop,
            config.feature_prefix,
            config.release_prefix,
            config.hotfix_prefix
        )))
    }

    /// Build the name of a new branch of `kind` from its token and parse it.
    pub fn compose(kind: BranchKind, token: &str, config: &BranchesConfig) -> Result<Self> {
        let name = match kind {
            BranchKind::Main => config.main.clone(),
            BranchKind::Develop => config.develop.clone(),
            BranchKind::Feature => format!("{}{}", config.feature_prefix, token),
            BranchKind::Release => format!("{}{}", config.release_prefix, token),
            BranchKind::Hotfix => format!("{}{}", config.hotfix_prefix, token),
        };
        Branch::parse(&name, config)
    }

    fn long_lived(name: &str, kind: BranchKind) -> Self {
        Branch {
            name: name.to_string(),
            kind,
            base: None,
            merge_targets: Vec::new(),
            version: None,
        }
    }

    fn flow(name: &str, kind: BranchKind, version: Option<Version>, config: &BranchesConfig) -> Self {
        let base = match kind {
            BranchKind::Hotfix => config.main.clone(),
            _ => config.develop.clone(),
        };
        let merge_targets = if kind.is_tagged() {
            vec![config.main.clone(), config.develop.clone()]
        } else {
            vec![config.develop.clone()]
        };

        Branch {
            name: name.to_string(),
            kind,
            base: Some(base),
            merge_targets,
            version,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// The branch this one is created from; `None` for long-lived branches
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Branches this one merges into when finished, main first
    pub fn merge_targets(&self) -> &[String] {
        &self.merge_targets
    }

    /// Version encoded in the name (always present for release branches)
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn check_token(token: &str, max_len: usize) -> std::result::Result<(), String> {
    if token.is_empty() {
        return Err("name after the prefix is empty".to_string());
    }
    if token.len() > max_len {
        return Err(format!("name exceeds {} characters", max_len));
    }
    if !TOKEN.is_match(token) {
        return Err(
            "use lowercase letters, digits, '.', '_' or '-', starting with a letter or digit"
                .to_string(),
        );
    }
    if token.contains("..") {
        return Err("name must not contain '..'".to_string());
    }
    if token.ends_with('.') || token.ends_with(".lock") {
        return Err("name must not end with '.' or '.lock'".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BranchesConfig {
        BranchesConfig::default()
    }

    #[test]
    fn test_long_lived_branches() {
        let main = Branch::parse("main", &cfg()).unwrap();
        assert_eq!(main.kind(), BranchKind::Main);
        assert_eq!(main.base(), None);
        assert!(main.merge_targets().is_empty());

        let develop = Branch::parse("develop", &cfg()).unwrap();
        assert_eq!(develop.kind(), BranchKind::Develop);
        assert!(!develop.kind().is_flow());
    }

    #[test]
    fn test_feature_branch() {
        let branch = Branch::parse("feature/user-auth", &cfg()).unwrap();
        assert_eq!(branch.kind(), BranchKind::Feature);
        assert_eq!(branch.base(), Some("develop"));
        assert_eq!(branch.merge_targets(), ["develop".to_string()]);
        assert!(!branch.kind().is_tagged());
    }

    #[test]
    fn test_release_branch() {
        let branch = Branch::parse("release/v1.2.0", &cfg()).unwrap();
        assert_eq!(branch.kind(), BranchKind::Release);
        assert_eq!(branch.base(), Some("develop"));
        assert_eq!(
            branch.merge_targets(),
            ["main".to_string(), "develop".to_string()]
        );
        assert_eq!(branch.version(), Some(&Version::new(1, 2, 0)));
    }

    #[test]
    fn test_release_branch_requires_semver() {
        assert!(Branch::parse("release/1.2.0", &cfg()).is_err());
        assert!(Branch::parse("release/v1.2", &cfg()).is_err());
        assert!(Branch::parse("release/next", &cfg()).is_err());
        assert!(Branch::parse("release/v1.2.0-rc.1", &cfg()).is_ok());
    }

    #[test]
    fn test_hotfix_branch() {
        let named = Branch::parse("hotfix/critical-auth", &cfg()).unwrap();
        assert_eq!(named.kind(), BranchKind::Hotfix);
        assert_eq!(named.base(), Some("main"));
        assert_eq!(named.version(), None);

        let versioned = Branch::parse("hotfix/v1.0.1", &cfg()).unwrap();
        assert_eq!(versioned.version(), Some(&Version::new(1, 0, 1)));
    }

    #[test]
    fn test_rejects_bad_names() {
        let cases = [
            "",
            "Main",
            "DEVELOP",
            "feature/",
            "feature/Bad Name!",
            "feature/UserAuth",
            "feature/x/",
            "feature/a..b",
            "feature/trailing.",
            "feature/-leading",
            "feature/x.lock",
            "bugfix/thing",
            "main/",
            "feat/x",
        ];
        for name in cases {
            let err = Branch::parse(name, &cfg()).unwrap_err();
            assert!(
                matches!(err, GitFlowError::InvalidBranchName { .. }),
                "'{}' should be rejected, got {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_token_length_bound() {
        let ok = format!("feature/{}", "a".repeat(100));
        let long = format!("feature/{}", "a".repeat(101));
        assert!(Branch::parse(&ok, &cfg()).is_ok());
        assert!(Branch::parse(&long, &cfg()).is_err());
    }

    #[test]
    fn test_compose() {
        let branch = Branch::compose(BranchKind::Feature, "login", &cfg()).unwrap();
        assert_eq!(branch.name(), "feature/login");
        assert!(Branch::compose(BranchKind::Feature, "Bad Name!", &cfg()).is_err());
    }

    #[test]
    fn test_custom_names() {
        let config = BranchesConfig {
            main: "trunk".to_string(),
            develop: "next".to_string(),
            feature_prefix: "feat/".to_string(),
            ..BranchesConfig::default()
        };
        let branch = Branch::parse("feat/x", &config).unwrap();
        assert_eq!(branch.base(), Some("next"));
        assert_eq!(Branch::parse("trunk", &config).unwrap().kind(), BranchKind::Main);
        assert!(Branch::parse("main", &config).is_err());
    }
}
