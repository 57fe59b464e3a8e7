use crate::domain::{BranchKind, Version};
use crate::error::{GitFlowError, Result};
use std::path::PathBuf;
use std::process::Command;

/// What a finish check is told about the branch being finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckContext {
    pub branch: String,
    pub kind: BranchKind,
    /// Version the finish will tag, if any
    pub version: Option<Version>,
}

impl CheckContext {
    /// Environment variables exposed to check commands
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("GITFLOW_BRANCH".to_string(), self.branch.clone()),
            ("GITFLOW_KIND".to_string(), self.kind.to_string()),
            (
                "GITFLOW_VERSION".to_string(),
                self.version
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}

/// Gate run before a branch is finished
pub trait CheckRunner {
    fn run(&self, context: &CheckContext) -> Result<()>;
}

/// Accepts every finish
pub struct NoChecks;

impl CheckRunner for NoChecks {
    fn run(&self, _context: &CheckContext) -> Result<()> {
        Ok(())
    }
}

/// Runs shell commands in order; the first non-zero exit fails the finish
pub struct CommandChecks {
    commands: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CommandChecks {
    pub fn new(commands: Vec<String>) -> Self {
        CommandChecks {
            commands,
            workdir: None,
        }
    }

    /// Run commands from `dir` instead of the process working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

impl CheckRunner for CommandChecks {
    /// Execute each command with `sh -c`
    ///
    /// # Returns
    /// * `Ok(())` if every command exits with code 0
    /// * `Err(ChecksFailed)` naming the failing command with its output
    fn run(&self, context: &CheckContext) -> Result<()> {
        for command in &self.commands {
            tracing::info!(command = %command, branch = %context.branch, "running finish check");

            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            for (key, value) in context.to_env_vars() {
                cmd.env(key, value);
            }
            if let Some(dir) = &self.workdir {
                cmd.current_dir(dir);
            }

            let output = cmd.output().map_err(|e| {
                GitFlowError::ChecksFailed(format!("Failed to execute '{}': {}", command, e))
            })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                return Err(GitFlowError::ChecksFailed(format!(
                    "'{}' failed with exit code {}\nStdout: {}\nStderr: {}",
                    command,
                    output.status.code().unwrap_or(-1),
                    stdout.trim_end(),
                    stderr.trim_end()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CheckContext {
        CheckContext {
            branch: "release/v1.1.0".to_string(),
            kind: BranchKind::Release,
            version: Some(Version::new(1, 1, 0)),
        }
    }

    #[test]
    fn test_env_vars() {
        let vars = context().to_env_vars();
        assert!(vars.contains(&("GITFLOW_KIND".to_string(), "release".to_string())));
        assert!(vars.contains(&("GITFLOW_VERSION".to_string(), "1.1.0".to_string())));
    }

    #[test]
    fn test_no_checks_pass() {
        assert!(NoChecks.run(&context()).is_ok());
    }

    #[test]
    fn test_passing_commands() {
        let checks = CommandChecks::new(vec![
            "true".to_string(),
            "test \"$GITFLOW_BRANCH\" = release/v1.1.0".to_string(),
        ]);
        assert!(checks.run(&context()).is_ok());
    }

    #[test]
    fn test_failing_command_stops() {
        let checks = CommandChecks::new(vec![
            "echo broken >&2; exit 3".to_string(),
            "true".to_string(),
        ]);
        let err = checks.run(&context()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit code 3"));
        assert!(msg.contains("broken"));
    }
}
