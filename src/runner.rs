//! Runs the enabled checkers over a corpus and accumulates a [`Summary`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cli::Check;
use crate::config::Config;
use crate::emoji::{EmojiCatalog, EmojiChecker};
use crate::error::Result;
use crate::file_discovery::FileDiscovery;
use crate::http_client::AsyncHttpClient;
use crate::images::ImageChecker;
use crate::links::{LinkChecker, LinkRecord};
use crate::summary::{HubResults, ResultsStore, Summary};
use crate::toc::TocChecker;
use crate::versions::StableVersions;

/// Outcome of a run.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: Summary,
    pub hubs: Vec<String>,
    pub duration: Duration,
}

/// Checks one corpus root with a resolved configuration.
pub struct CheckRunner {
    root: PathBuf,
    config: Config,
    discovery: FileDiscovery,
}

impl CheckRunner {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        let discovery = FileDiscovery::new(root.clone(), config.corpus.hub_prefix.clone());
        Self {
            root,
            config,
            discovery,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn discovery(&self) -> &FileDiscovery {
        &self.discovery
    }

    fn path(&self, configured: &Path) -> PathBuf {
        Config::resolve(&self.root, configured)
    }

    pub fn results_store(&self) -> ResultsStore {
        ResultsStore::new(self.path(&self.config.paths.results_dir))
    }

    pub fn stable_versions(&self) -> Result<StableVersions> {
        StableVersions::load(&self.path(&self.config.paths.stable_versions))
    }

    /// Configured hubs, else the hubs of the stable versions table, else the
    /// hub directories found on disk.
    pub fn hubs(&self, stable: &StableVersions) -> Result<Vec<String>> {
        if !self.config.corpus.hubs.is_empty() {
            return Ok(self.config.corpus.hubs.clone());
        }
        let declared: Vec<String> = stable.hubs().map(str::to_string).collect();
        if !declared.is_empty() {
            return Ok(declared);
        }
        self.discovery.discover_hubs()
    }

    /// Run every enabled check in order: links, emoji, ToC, images.
    pub async fn run(&self) -> Result<RunOutcome> {
        let started = Instant::now();
        let stable = self.stable_versions()?;
        let hubs = self.hubs(&stable)?;
        info!(root = %self.root.display(), hubs = ?hubs, "starting checks");

        let mut summary = Summary::with_store(self.results_store());

        if self.config.is_enabled(Check::Links) {
            let checker = LinkChecker::new(&self.discovery, &stable, &self.config.corpus.site_domain);
            summary.add_links(checker.check_all(&hubs)?)?;
        }

        if self.config.is_enabled(Check::Emoji) {
            self.check_emoji(&hubs, &mut summary).await?;
        }

        if self.config.is_enabled(Check::Toc) {
            self.check_toc(&hubs, &stable, &mut summary)?;
        }

        if self.config.is_enabled(Check::Images) {
            self.check_images(&hubs, &mut summary)?;
        }

        let duration = started.elapsed();
        info!(?duration, issues = summary.has_issues(), "checks finished");
        Ok(RunOutcome {
            summary,
            hubs,
            duration,
        })
    }

    async fn check_emoji(&self, hubs: &[String], summary: &mut Summary) -> Result<()> {
        let client = AsyncHttpClient::new(self.config.http_client_config())?;
        let catalog = EmojiCatalog::load_or_fetch(
            &self.path(&self.config.paths.emoji_names),
            &self.config.network.emoji_url,
            &client,
        )
        .await?;
        debug!(names = catalog.len(), "emoji catalog ready");

        let mut checker = EmojiChecker::new(&self.discovery, &catalog);
        let results = checker.check_all(hubs)?;
        if !checker.bad_names().is_empty() {
            warn!(names = ?checker.bad_names(), "unavailable emoji used");
        }
        summary.add_emoji(results)
    }

    fn check_toc(&self, hubs: &[String], stable: &StableVersions, summary: &mut Summary) -> Result<()> {
        let checker = TocChecker::new(&self.discovery, stable, self.config.toc_options());
        let report = checker.check_all(hubs)?;
        for (hub, redirects) in &report.redirects {
            summary.add_extra_summary(hub, &redirects.summary_text());
            if redirects.has_failures() {
                summary.add_failure(
                    hub,
                    format!("{} broken redirects", redirects.broken.len()),
                );
            }
        }
        summary.add_toc(report.pages)
    }

    /// Uses this run's link results, or the persisted ones when links were
    /// not checked in this run.
    fn check_images(&self, hubs: &[String], summary: &mut Summary) -> Result<()> {
        let loaded: HubResults<LinkRecord>;
        let links = match &summary.links {
            Some(links) => links,
            None => {
                loaded = self.results_store().load("links")?;
                &loaded
            }
        };

        let options = self.config.image_options();
        let reports = ImageChecker::new(&self.discovery, options.clone()).check_all(hubs, links)?;
        for (hub, report) in reports {
            summary.add_extra_summary(&hub, &report.summary_text(&options));
            if report.has_failures() {
                summary.add_failure(
                    &hub,
                    format!("{} broken image paths", report.declared.broken.len()),
                );
            }
            summary.add_image_usage(&hub, report.usage);
        }
        Ok(())
    }
}
