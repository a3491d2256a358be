use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show the final verdict and fatal errors
    Quiet,
    /// Show the report
    #[default]
    Normal,
    /// Show the report with timing and log progress
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Default `tracing` filter directive for this level.
    pub fn log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// A checker that can be enabled for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    Links,
    Emoji,
    Toc,
    Images,
}

impl Check {
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name.trim(), true).ok()
    }
}

/// Link, emoji, ToC and image checker for FarmBot documentation hubs
#[derive(Parser, Debug, Clone)]
#[command(name = "docs-check")]
#[command(about = "Check links, emoji, tables of contents and images of documentation hubs")]
#[command(version)]
pub struct Cli {
    /// Directory containing the hub directories
    #[arg(default_value = ".", help = "Corpus root containing farmbot-<hub> directories")]
    pub path: PathBuf,

    /// Checks to run (repeatable)
    #[arg(short = 'c', long = "check", value_enum, action = clap::ArgAction::Append)]
    pub checks: Vec<Check>,

    /// Hubs to check (repeatable); defaults to the hubs of the stable versions file
    #[arg(long = "hub", action = clap::ArgAction::Append)]
    pub hubs: Vec<String>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Directory receiving the JSON result files
    #[arg(long = "results-dir")]
    pub results_dir: Option<PathBuf>,

    /// Stable versions file
    #[arg(long = "stable-versions")]
    pub stable_versions: Option<PathBuf>,

    /// Valid emoji names file
    #[arg(long = "emoji-names")]
    pub emoji_names: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (verdict only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Maximum number of broken links listed per hub
    #[arg(long = "max-link-issues")]
    pub max_link_issues: Option<usize>,

    /// Maximum number of broken images listed per hub
    #[arg(long = "max-image-issues")]
    pub max_image_issues: Option<usize>,

    /// Only list broken links having this issue code (e.g. not_found)
    #[arg(long = "issue-filter")]
    pub issue_filter: Option<String>,

    /// Include potential sizes and most referenced images in the image report
    #[arg(long = "image-extras")]
    pub image_extras: bool,

    /// HTTP request timeout in seconds for the emoji catalog download
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.is_dir() {
            return Err(format!("Path is not a directory: {}", self.path.display()));
        }
        if let Some(filter) = &self.issue_filter
            && crate::links::link_issue_from_code(filter).is_none()
        {
            return Err(format!("Unknown link issue: {}", filter));
        }
        Ok(())
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
