//! User interface module - interaction (prompts), JSON output and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and machine-readable output

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_guard_result, display_status,
    display_success, format_abandon, format_advice, format_create, format_finish,
    format_flow_status, format_guard_denial,
};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Accepts "y" or "yes" (case-insensitive) as confirmation. Default is "no"
/// if user presses Enter.
pub fn confirm_action(prompt: &str) -> Result<bool> {
    print!("\n{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_confirmation(&input))
}

fn is_confirmation(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

/// Render a result as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print a result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

/// JSON document for a failed command
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub ok: bool,
    pub kind: Option<crate::ErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(err: &anyhow::Error) -> Self {
        let flow_error = err.downcast_ref::<crate::GitFlowError>();
        ErrorReport {
            ok: false,
            kind: flow_error.and_then(|e| e.kind()),
            message: format!("{:#}", err),
            paths: flow_error
                .map(|e| e.conflicted_paths().to_vec())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitFlowError;

    #[test]
    fn test_confirmation_answers() {
        assert!(is_confirmation("y\n"));
        assert!(is_confirmation(" YES "));
        assert!(!is_confirmation("\n"));
        assert!(!is_confirmation("no"));
    }

    #[test]
    fn test_error_report_keeps_kind_and_paths() {
        let err = anyhow::Error::new(GitFlowError::MergeConflict {
            branch: "feature/a".into(),
            target: "develop".into(),
            paths: vec!["src/lib.rs".into()],
        });
        let report = ErrorReport::from_error(&err);
        let json: serde_json::Value = serde_json::from_str(&to_json(&report).unwrap()).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["kind"], "MergeConflict");
        assert_eq!(json["paths"][0], "src/lib.rs");
    }

    #[test]
    fn test_error_report_for_plain_error() {
        let report = ErrorReport::from_error(&anyhow::anyhow!("boom"));
        assert_eq!(report.kind, None);
        assert!(report.paths.is_empty());
    }
}
