//! Command line definitions
//!
//! Argument parsing lives here; [`orchestration`] turns a parsed [`Cli`] into
//! calls on the library and an exit code.

pub mod orchestration;

pub use orchestration::run;

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "git-flow")]
#[command(author, version, about = "Git Flow automation with conventional commits", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Custom configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Print machine-readable JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "repo", global = true)]
    pub repo: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate commit messages against the conventional grammar
    #[command(group(ArgGroup::new("input").required(true).args(["message", "file", "last"])))]
    ValidateCommit {
        /// Message to validate
        message: Option<String>,

        /// Read the message from a file, ignoring `#` comment lines
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Validate the last N non-merge commits on the current branch
        #[arg(short, long)]
        last: Option<usize>,
    },

    /// Suggest the next version from commits since the latest tag
    SuggestVersion {
        /// Branch to analyze (default: current branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Analyze commits since this tag instead of the latest one
        #[arg(long)]
        from_tag: Option<String>,
    },

    /// Insert a section for a version into the changelog
    GenerateChangelog {
        /// Version of the section (default: from a release branch or the advice)
        #[arg(long)]
        version: Option<String>,

        /// Collect commits since this tag
        #[arg(long)]
        from_tag: Option<String>,

        /// Branch to read commits from (default: current branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Changelog file (default: changelog.path from the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the section without writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Create feature/<name> from develop
    CreateFeature {
        /// Feature name, e.g. user-auth
        name: String,
    },

    /// Create release/v<version> from develop
    CreateRelease {
        /// Release version (default: suggested from commits on develop)
        version: Option<String>,
    },

    /// Create a hotfix branch from main
    CreateHotfix {
        /// Hotfix name (default: v<next patch version>)
        name: Option<String>,

        /// Hotfix version (default: patch bump of the latest tag on main)
        #[arg(long, conflicts_with = "name")]
        version: Option<String>,
    },

    /// Merge the current flow branch into its targets
    FinishBranch {
        /// Keep the branch after finishing
        #[arg(long)]
        no_delete: bool,

        /// Do not run the configured finish checks
        #[arg(long)]
        skip_checks: bool,
    },

    /// Delete the current flow branch without merging it
    AbandonBranch {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show the current branch, its readiness and the flow branches
    FlowStatus,

    /// Run a guard, for use from git hooks
    #[command(subcommand)]
    Guard(GuardCommand),

    /// Agent pre-tool-use gate: reads the event JSON on stdin
    Hook,
}

#[derive(Debug, Subcommand)]
pub enum GuardCommand {
    /// Check a commit message file (commit-msg hook)
    CommitMsg {
        /// Path to the message file
        file: PathBuf,
    },

    /// Check pushed refs against the protected branches (pre-push hook)
    PrePush {
        /// Remote name passed by git
        remote: Option<String>,

        /// Remote URL passed by git
        url: Option<String>,

        /// Check this branch instead of reading refs from stdin
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Check a branch name (default: current branch)
    BranchName { name: Option<String> },
}
