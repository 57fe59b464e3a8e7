//! Agent pre-tool-use gate
//!
//! Reads the JSON event an agent emits before running a shell command, finds
//! the git invocations in it and applies the guards:
//! - `git commit` on a protected branch, or with a message that breaks the grammar
//! - `git push` to a protected branch
//! - `git checkout -b` / `git switch -c` / `git branch` with an invalid name
//!
//! The decision is written back as a `hookSpecificOutput` document.

pub mod command;

pub use command::GitCommand;

use crate::config::Config;
use crate::error::{ErrorKind, GitFlowError, Result};
use crate::guard::{Guard, GuardResult, MutationOrigin, Operation};
use serde::{Deserialize, Serialize};

const SHELL_TOOL: &str = "Bash";
const EVENT_NAME: &str = "PreToolUse";

/// The subset of a pre-tool-use event the gate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: String,
}

impl HookEvent {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GitFlowError::HookInput(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub permission_decision: PermissionDecision,
    pub permission_decision_reason: String,
}

/// Document printed back to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookDecision {
    #[serde(rename = "hookSpecificOutput")]
    pub output: HookSpecificOutput,
}

impl From<&GuardResult> for HookDecision {
    fn from(result: &GuardResult) -> Self {
        HookDecision {
            output: HookSpecificOutput {
                hook_event_name: EVENT_NAME.to_string(),
                permission_decision: if result.allowed {
                    PermissionDecision::Allow
                } else {
                    PermissionDecision::Deny
                },
                permission_decision_reason: result.message.clone(),
            },
        }
    }
}

pub struct HookGate {
    guard: Guard,
}

impl HookGate {
    pub fn new(config: &Config) -> Self {
        HookGate {
            guard: Guard::new(config),
        }
    }

    /// Judge every git invocation in the event; the first denial wins.
    ///
    /// `current_branch` is the branch checked out where the command will run,
    /// when it can be determined.
    pub fn evaluate(&self, event: &HookEvent, current_branch: Option<&str>) -> GuardResult {
        if event.tool_name != SHELL_TOOL {
            return GuardResult::allow(format!("'{}' is not a shell command", event.tool_name));
        }

        let commands = command::parse(&event.tool_input.command);
        for cmd in &commands {
            let result = self.check(cmd, current_branch);
            if !result.allowed {
                tracing::info!(command = %event.tool_input.command, reason = %result.message, "hook denied");
                return result;
            }
        }

        if commands.is_empty() {
            GuardResult::allow("No git command to check")
        } else {
            GuardResult::allow("Git commands pass the flow guards")
        }
    }

    fn check(&self, cmd: &GitCommand, current_branch: Option<&str>) -> GuardResult {
        match cmd {
            GitCommand::CommitHeredoc => GuardResult::deny(
                ErrorKind::InvalidCommitFormat,
                "Heredoc commit messages cannot be validated before they run. \
                 Pass the subject and each body paragraph with separate -m flags",
            ),
            GitCommand::Commit { messages } => {
                if let Some(branch) = current_branch {
                    let result =
                        self.guard
                            .check_protected(branch, Operation::Commit, MutationOrigin::Direct);
                    if !result.allowed {
                        return result;
                    }
                }
                if messages.is_empty() {
                    return GuardResult::allow("No inline message to validate");
                }
                self.guard.check_commit_message(&messages.join("\n\n"))
            }
            GitCommand::Push {
                refspecs,
                tags_only,
                ..
            } => {
                let targets: Vec<String> = if refspecs.is_empty() {
                    match current_branch {
                        Some(branch) if !tags_only => vec![branch.to_string()],
                        _ => Vec::new(),
                    }
                } else {
                    refspecs
                        .iter()
                        .filter_map(|spec| push_destination(spec, current_branch))
                        .collect()
                };

                targets
                    .iter()
                    .map(|t| {
                        self.guard
                            .check_protected(t, Operation::Push, MutationOrigin::Direct)
                    })
                    .find(|r| !r.allowed)
                    .unwrap_or_else(|| GuardResult::allow("Push targets no protected branch"))
            }
            GitCommand::CreateBranch { name } => self.guard.check_branch_name(name),
        }
    }
}

/// Branch a refspec writes to on the remote
fn push_destination(refspec: &str, current_branch: Option<&str>) -> Option<String> {
    let refspec = refspec.trim_start_matches('+');
    let dest = match refspec.split_once(':') {
        Some((_, dest)) => dest,
        None => refspec,
    };
    let dest = dest.strip_prefix("refs/heads/").unwrap_or(dest);
    match dest {
        "HEAD" | "@" => current_branch.map(str::to_string),
        "" => None,
        _ => Some(dest.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> HookGate {
        HookGate::new(&Config::default())
    }

    fn bash(command: &str) -> HookEvent {
        HookEvent {
            tool_name: SHELL_TOOL.to_string(),
            tool_input: ToolInput {
                command: command.to_string(),
            },
        }
    }

    #[test]
    fn test_parse_event() {
        let event = HookEvent::from_json(
            r#"{"session_id":"s","tool_name":"Bash","tool_input":{"command":"git status"}}"#,
        )
        .unwrap();
        assert_eq!(event.tool_name, "Bash");
        assert_eq!(event.tool_input.command, "git status");
        assert!(HookEvent::from_json("not json").is_err());
    }

    #[test]
    fn test_other_tools_allowed() {
        let event = HookEvent {
            tool_name: "Edit".to_string(),
            tool_input: ToolInput::default(),
        };
        assert!(gate().evaluate(&event, Some("main")).allowed);
    }

    #[test]
    fn test_commit_message_checked() {
        let g = gate();
        assert!(g
            .evaluate(&bash("git commit -m 'feat: add login'"), Some("feature/a"))
            .allowed);
        let denied = g.evaluate(&bash("git commit -m 'Added stuff'"), Some("feature/a"));
        assert!(!denied.allowed);
        assert_eq!(denied.kind, Some(ErrorKind::InvalidCommitFormat));
    }

    #[test]
    fn test_multiple_m_flags_form_body() {
        let result = gate().evaluate(
            &bash("git commit -m 'fix: null check' -m 'BREAKING CHANGE: drops v1 api'"),
            None,
        );
        assert!(result.allowed);
    }

    #[test]
    fn test_heredoc_denied() {
        let result = gate().evaluate(
            &bash("git commit -m \"$(cat <<'EOF'\nfeat: x\nEOF\n)\""),
            Some("feature/a"),
        );
        assert!(!result.allowed);
        assert!(result.message.contains("-m"));
    }

    #[test]
    fn test_commit_on_protected_branch_denied() {
        let result = gate().evaluate(&bash("git commit -m 'fix: a'"), Some("main"));
        assert_eq!(result.kind, Some(ErrorKind::ProtectedBranchViolation));
    }

    #[test]
    fn test_push_targets() {
        let g = gate();
        assert!(!g.evaluate(&bash("git push origin main"), Some("feature/a")).allowed);
        assert!(!g.evaluate(&bash("git push"), Some("develop")).allowed);
        assert!(!g
            .evaluate(&bash("git push origin HEAD:refs/heads/develop"), Some("feature/a"))
            .allowed);
        assert!(!g.evaluate(&bash("git push -f origin main"), None).allowed);
        assert!(g
            .evaluate(&bash("git push -u origin feature/a"), Some("feature/a"))
            .allowed);
        assert!(g.evaluate(&bash("git push --tags"), Some("main")).allowed);
    }

    #[test]
    fn test_branch_creation_named() {
        let g = gate();
        assert!(g.evaluate(&bash("git checkout -b feature/user-auth"), None).allowed);
        let denied = g.evaluate(&bash("git checkout -b feat/something"), None);
        assert_eq!(denied.kind, Some(ErrorKind::InvalidBranchName));
        assert!(!g.evaluate(&bash("git switch -c release/1.0.0"), None).allowed);
    }

    #[test]
    fn test_decision_document() {
        let result = gate().evaluate(&bash("git push origin develop"), Some("feature/a"));
        let json = serde_json::to_value(HookDecision::from(&result)).unwrap();
        assert_eq!(json["hookSpecificOutput"]["hookEventName"], "PreToolUse");
        assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "deny");
        assert!(json["hookSpecificOutput"]["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("develop"));
    }
}
