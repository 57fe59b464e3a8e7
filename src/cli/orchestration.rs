//! Command orchestration
//!
//! Turns a parsed [`Cli`] into library calls and an exit code. Every command
//! prints either a human summary or, with `--json`, a single JSON document on
//! stdout. Errors exit with status 1, as do denied guards.

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use super::{Cli, Commands, GuardCommand};
use crate::analyzer::{History, VersionAdvisor};
use crate::changelog::ChangelogSynthesizer;
use crate::config::{load_config, Config};
use crate::conventional::{strip_comments, CommitValidator, Rule};
use crate::domain::{Branch, BranchKind, CommitRecord, Version};
use crate::flow::{CommandChecks, FinishOptions, FlowManager};
use crate::git::{Git2Repository, RawCommit, Repository};
use crate::guard::{Guard, GuardResult, MutationOrigin, Operation};
use crate::hooks::{HookDecision, HookEvent, HookGate};
use crate::ui;

/// Run a command and report its outcome. Returns the process exit code.
pub fn run(cli: Cli) -> i32 {
    let json = cli.json;
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            if json {
                if let Err(e) = ui::print_json(&ui::ErrorReport::from_error(&err)) {
                    ui::display_error(&format!("{:#}", e));
                }
            } else {
                ui::display_error(&format!("{:#}", err));
            }
            1
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    if let Some(dir) = &cli.repo {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Cannot change directory to {}", dir.display()))?;
    }
    let config = load_config(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::ValidateCommit {
            message,
            file,
            last,
        } => validate_commit(&config, json, message, file, last),
        Commands::SuggestVersion { branch, from_tag } => {
            suggest_version(&config, json, branch, from_tag)
        }
        Commands::GenerateChangelog {
            version,
            from_tag,
            branch,
            output,
            dry_run,
        } => generate_changelog(&config, json, version, from_tag, branch, output, dry_run),
        Commands::CreateFeature { name } => {
            let mut flow = flow_manager(config)?;
            let report = flow.create_feature(&name)?;
            emit(json, &report, || ui::display_success(&ui::format_create(&report)))
        }
        Commands::CreateRelease { version } => {
            let version = version.as_deref().map(Version::parse).transpose()?;
            let mut flow = flow_manager(config)?;
            let report = flow.create_release(version)?;
            emit(json, &report, || {
                if let Some(advice) = &report.advice {
                    print!("{}", ui::format_advice(advice));
                }
                ui::display_success(&ui::format_create(&report));
            })
        }
        Commands::CreateHotfix { name, version } => {
            let version = version.as_deref().map(Version::parse).transpose()?;
            let mut flow = flow_manager(config)?;
            let report = flow.create_hotfix(name.as_deref(), version)?;
            emit(json, &report, || ui::display_success(&ui::format_create(&report)))
        }
        Commands::FinishBranch {
            no_delete,
            skip_checks,
        } => {
            let mut options = FinishOptions::from_config(&config);
            options.delete_branch &= !no_delete;
            options.run_checks = !skip_checks;
            let mut flow = flow_manager(config)?;
            let report = flow.finish(options)?;
            emit(json, &report, || ui::display_success(&ui::format_finish(&report)))
        }
        Commands::AbandonBranch { yes } => abandon_branch(config, json, yes),
        Commands::FlowStatus => {
            let flow = flow_manager(config)?;
            let status = flow.status()?;
            emit(json, &status, || print!("{}", ui::format_flow_status(&status)))
        }
        Commands::Guard(command) => run_guard(&config, json, command),
        Commands::Hook => run_hook(&config),
    }
}

/// Print `value` as JSON, or run `human` to print a summary.
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce()) -> Result<i32> {
    if json {
        ui::print_json(value)?;
    } else {
        human();
    }
    Ok(0)
}

fn open_repo() -> Result<Git2Repository> {
    Git2Repository::open(".").context("Not inside a git repository")
}

fn flow_manager(config: Config) -> Result<FlowManager<Git2Repository>> {
    let repo = open_repo()?;
    let workdir = repo.workdir().map(Path::to_path_buf);
    let commands = config.behavior.finish_checks.clone();
    let flow = FlowManager::new(repo, config)?;

    Ok(match workdir {
        Some(dir) if !commands.is_empty() => {
            flow.with_checks(Box::new(CommandChecks::new(commands).in_dir(dir)))
        }
        _ => flow,
    })
}

/// Outcome of validating one message
#[derive(Debug, Serialize)]
struct CommitCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    subject: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<CommitRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CommitCheck {
    fn run(validator: &CommitValidator, hash: Option<String>, message: &str) -> Self {
        let subject = message.trim().lines().next().unwrap_or_default().to_string();
        match validator.validate(message) {
            Ok(record) => CommitCheck {
                hash,
                subject,
                valid: true,
                record: Some(record),
                rule: None,
                error: None,
            },
            Err(violation) => CommitCheck {
                hash,
                subject,
                valid: false,
                record: None,
                rule: Some(violation.rule),
                error: Some(violation.to_string()),
            },
        }
    }

    fn display(&self) {
        let label = match &self.hash {
            Some(hash) => format!("{} {}", hash.get(..7).unwrap_or(hash.as_str()), self.subject),
            None => self.subject.clone(),
        };
        match &self.error {
            None => ui::display_success(&label),
            Some(error) => ui::display_error(&format!("{}\n  {}", label, error)),
        }
    }
}

#[derive(Debug, Serialize)]
struct CommitSummary {
    checked: usize,
    invalid: usize,
    commits: Vec<CommitCheck>,
}

fn validate_commit(
    config: &Config,
    json: bool,
    message: Option<String>,
    file: Option<PathBuf>,
    last: Option<usize>,
) -> Result<i32> {
    let validator = CommitValidator::new(&config.commits);

    if let Some(count) = last {
        let repo = open_repo()?;
        let commits = repo.commits_since(None, "HEAD")?;
        let recent: Vec<&RawCommit> = commits.iter().rev().filter(|c| !c.is_merge).take(count).collect();
        let checks: Vec<CommitCheck> = recent
            .into_iter()
            .rev()
            .map(|c| CommitCheck::run(&validator, Some(c.hash.clone()), &c.message))
            .collect();
        let summary = CommitSummary {
            checked: checks.len(),
            invalid: checks.iter().filter(|c| !c.valid).count(),
            commits: checks,
        };

        if json {
            ui::print_json(&summary)?;
        } else {
            summary.commits.iter().for_each(CommitCheck::display);
            ui::display_status(&format!(
                "{} of {} commit(s) valid",
                summary.checked - summary.invalid,
                summary.checked
            ));
        }
        return Ok(if summary.invalid == 0 { 0 } else { 1 });
    }

    let text = match (message, file) {
        (Some(message), _) => message,
        (None, Some(path)) => strip_comments(
            &fs::read_to_string(&path)
                .with_context(|| format!("Cannot read {}", path.display()))?,
        ),
        (None, None) => bail!("Nothing to validate"),
    };

    let check = CommitCheck::run(&validator, None, &text);
    if json {
        ui::print_json(&check)?;
    } else {
        check.display();
    }
    Ok(if check.valid { 0 } else { 1 })
}

fn history_for(
    config: &Config,
    branch: Option<String>,
    from_tag: Option<&str>,
) -> Result<(Git2Repository, VersionAdvisor, String, History)> {
    let repo = open_repo()?;
    let branch = match branch {
        Some(branch) => branch,
        None => repo.current_branch()?,
    };
    let advisor = VersionAdvisor::new(config)?;
    let history = advisor.history(&repo, &branch, from_tag)?;
    Ok((repo, advisor, branch, history))
}

fn suggest_version(
    config: &Config,
    json: bool,
    branch: Option<String>,
    from_tag: Option<String>,
) -> Result<i32> {
    let (_, advisor, branch, history) = history_for(config, branch, from_tag.as_deref())?;
    let advice = advisor.advise(&history);
    tracing::debug!(branch = %branch, bump = %advice.bump, "suggested version");

    emit(json, &advice, || {
        advice.warnings.iter().for_each(ui::display_boundary_warning);
        print!("{}", ui::format_advice(&advice));
    })
}

#[derive(Debug, Serialize)]
struct ChangelogReport {
    path: PathBuf,
    version: String,
    changed: bool,
    written: bool,
    section: Option<String>,
}

fn generate_changelog(
    config: &Config,
    json: bool,
    version: Option<String>,
    from_tag: Option<String>,
    branch: Option<String>,
    output: Option<PathBuf>,
    dry_run: bool,
) -> Result<i32> {
    let (repo, advisor, branch, history) = history_for(config, branch, from_tag.as_deref())?;

    let version = match version {
        Some(version) => Version::parse(&version)?,
        None => infer_version(config, &branch, &advisor, &history)?,
    };
    let label = advisor.pattern().format(&version);

    let path = output.unwrap_or_else(|| match repo.workdir() {
        Some(dir) => dir.join(&config.changelog.path),
        None => config.changelog.path.clone(),
    });
    let existing = if path.exists() {
        fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path.display()))?
    } else {
        String::new()
    };

    let update = ChangelogSynthesizer::new(&config.changelog).update(
        &existing,
        &label,
        Local::now().date_naive(),
        &history.records,
    );
    let written = update.changed && !dry_run;
    if written {
        fs::write(&path, &update.document)
            .with_context(|| format!("Cannot write {}", path.display()))?;
    }

    let report = ChangelogReport {
        path,
        version: label,
        changed: update.changed,
        written,
        section: update.section,
    };
    emit(json, &report, || {
        history.warnings.iter().for_each(ui::display_boundary_warning);
        match &report.section {
            Some(section) => {
                println!("{}", section);
                if report.written {
                    ui::display_success(&format!("Updated {}", report.path.display()));
                } else {
                    ui::display_status("Dry run: changelog not written");
                }
            }
            None if history.records.is_empty() => {
                ui::display_status("No conventional commits to add");
            }
            None => ui::display_status(&format!(
                "{} already has a section for {}",
                report.path.display(),
                report.version
            )),
        }
    })
}

/// A release branch names its version; elsewhere the advice decides.
fn infer_version(
    config: &Config,
    branch: &str,
    advisor: &VersionAdvisor,
    history: &History,
) -> Result<Version> {
    if let Ok(parsed) = Branch::parse(branch, &config.branches) {
        if parsed.kind() == BranchKind::Release {
            if let Some(version) = parsed.version() {
                return Ok(version.clone());
            }
        }
    }
    match advisor.advise(history).suggested_version {
        Some(version) => Ok(version),
        None => bail!("Cannot infer the version for '{}'; pass --version", branch),
    }
}

fn abandon_branch(config: Config, json: bool, yes: bool) -> Result<i32> {
    let mut flow = flow_manager(config)?;
    let current = flow.repo().current_branch()?;

    if !yes && !json && !ui::confirm_action(&format!("Delete '{}' without merging?", current))? {
        println!("Operation cancelled by user.");
        return Ok(0);
    }

    let report = flow.abandon()?;
    emit(json, &report, || ui::display_success(&ui::format_abandon(&report)))
}

fn run_guard(config: &Config, json: bool, command: GuardCommand) -> Result<i32> {
    let guard = Guard::new(config);

    let result = match command {
        GuardCommand::CommitMsg { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            guard.check_commit_message(&strip_comments(&raw))
        }
        GuardCommand::PrePush { remote, branch, .. } => {
            let targets = match branch {
                Some(branch) => vec![branch],
                None => match pushed_branches()? {
                    Some(branches) => branches,
                    None => vec![open_repo()?.current_branch()?],
                },
            };
            tracing::debug!(remote = ?remote, targets = ?targets, "checking push");

            targets
                .iter()
                .map(|t| guard.check_protected(t, Operation::Push, MutationOrigin::Direct))
                .find(|r| !r.allowed)
                .unwrap_or_else(|| GuardResult::allow("Push targets no protected branch"))
        }
        GuardCommand::BranchName { name } => {
            let name = match name {
                Some(name) => name,
                None => open_repo()?.current_branch()?,
            };
            guard.check_branch_name(&name)
        }
    };

    if json {
        ui::print_json(&result)?;
    } else {
        ui::display_guard_result(&result);
    }
    Ok(if result.allowed { 0 } else { 1 })
}

/// Remote branches named in the ref lines git writes to a pre-push hook.
/// Branches named by the ref lines git feeds a pre-push hook.
///
/// `None` when no ref lines were given; a push of tags only yields an empty
/// list rather than falling back to the current branch.
fn pushed_branches() -> Result<Option<Vec<String>>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut input = String::new();
    stdin.lock().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_push_lines(&input)))
}

fn parse_push_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .filter_map(|line| line.split_whitespace().nth(2))
        .filter_map(|remote_ref| remote_ref.strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect()
}

fn run_hook(config: &Config) -> Result<i32> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let event = HookEvent::from_json(&input)?;

    let current = open_repo().ok().and_then(|repo| repo.current_branch().ok());
    let result = HookGate::new(config).evaluate(&event, current.as_deref());
    ui::print_json(&HookDecision::from(&result))?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_push_lines() {
        let input = "refs/heads/feature/a 1111 refs/heads/feature/a 0000\n\
                     refs/tags/v1.0.0 2222 refs/tags/v1.0.0 0000\n\
                     refs/heads/main 3333 refs/heads/main 4444\n";
        assert_eq!(parse_push_lines(input), vec!["feature/a", "main"]);
        assert!(parse_push_lines("").is_empty());
    }

    #[test]
    fn test_parse_push_lines_ignores_tags() {
        let zero = "0000000000000000000000000000000000000000";
        let input = format!(
            "refs/tags/v1.0.0 2222 refs/tags/v1.0.0 {zero}\n(delete) {zero} refs/tags/v0.9.0 3333\n"
        );
        assert!(parse_push_lines(&input).is_empty());
    }

    #[test]
    fn test_commit_check() {
        let validator = CommitValidator::new(&Config::default().commits);
        let ok = CommitCheck::run(&validator, None, "feat(api): add endpoint\n\nbody");
        assert!(ok.valid);
        assert_eq!(ok.subject, "feat(api): add endpoint");

        let bad = CommitCheck::run(&validator, Some("abcdef1234".into()), "Fix.");
        assert!(!bad.valid);
        assert_eq!(bad.rule, Some(Rule::Grammar));
    }

    #[test]
    fn test_infer_version_from_release_branch() {
        let config = Config::default();
        let advisor = VersionAdvisor::new(&config).unwrap();
        let history = History {
            reference: "release/v2.1.0".to_string(),
            baseline: None,
            records: Vec::new(),
            warnings: Vec::new(),
        };
        assert_eq!(
            infer_version(&config, "release/v2.1.0", &advisor, &history).unwrap(),
            Version::new(2, 1, 0)
        );
        assert!(infer_version(&config, "develop", &advisor, &history).is_err());
    }
}
