//! # docs-check Library
//!
//! Checks a tree of FarmBot documentation hubs (`farmbot-<hub>/<version>/...`)
//! for broken links and sections, unavailable emoji, ToC and redirect drift,
//! and unused or missing images.

pub mod cli;
pub mod config;
pub mod emoji;
pub mod error;
pub mod error_reporter;
pub mod extract;
pub mod file_discovery;
pub mod http_client;
pub mod images;
pub mod issues;
pub mod links;
pub mod output;
pub mod runner;
pub mod sections;
pub mod summary;
pub mod toc;
pub mod versions;

pub use cli::{Check, Cli, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use emoji::{EmojiCatalog, EmojiChecker, EmojiIssue, EmojiRecord};
pub use error::{CheckError, Result};
pub use error_reporter::ErrorReporter;
pub use file_discovery::{FileDiscovery, MarkdownPage};
pub use http_client::{AsyncHttpClient, HttpClientConfig};
pub use images::{ImageChecker, ImageOptions, ImageReport, ImageUsage};
pub use links::{LinkChecker, LinkIssue, LinkRecord, LinkRelation};
pub use output::{Output, ReportOptions};
pub use runner::{CheckRunner, RunOutcome};
pub use sections::SectionIndex;
pub use summary::{HubResults, ResultsStore, Summary};
pub use toc::{TocChecker, TocIssue, TocOptions, TocPageRecord};
pub use versions::StableVersions;
