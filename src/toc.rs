//! Table-of-contents reconciliation.
//!
//! Each hub declares its navigation in `_data/toc/*.yml`. Every declared
//! page must exist with a matching front-matter title, and the latest
//! version of a hub must be fully reachable through redirects and the ToC.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CheckError, Result};
use crate::file_discovery::{FileDiscovery, is_markdown, join_target, read_lines, to_slash};
use crate::issues::{self, Issue};
use crate::summary::HubResults;
use crate::versions::{self, StableVersions, VersionValue};

/// ToC documents, relative to the hub directory.
pub const TOC_DIR: &str = "_data/toc";

/// Redirect stubs, relative to the hub directory.
pub const REDIRECTS_DIR: &str = "_redirects";

const TITLE_MARKER: &str = "title: ";
const PAGE_PATH_MARKER: &str = "page_path:";

/// Issues of a ToC page entry, in display precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TocIssue {
    PageMissing,
    TitleMismatch,
    RedirectMissing,
}

impl TocIssue {
    /// Issues that are reported but never make an entry broken.
    pub fn is_advisory(self) -> bool {
        matches!(self, TocIssue::TitleMismatch | TocIssue::RedirectMissing)
    }
}

impl Issue for TocIssue {
    fn code(&self) -> &'static str {
        match self {
            TocIssue::PageMissing => "page_missing",
            TocIssue::TitleMismatch => "title_mismatch",
            TocIssue::RedirectMissing => "redirect_missing",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TocIssue::PageMissing => "missing page",
            TocIssue::TitleMismatch => "page title mismatch",
            TocIssue::RedirectMissing => "redirect missing",
        }
    }
}

/// One checked ToC page entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocPageRecord {
    pub status: String,
    pub version: String,
    /// Hub-relative markdown path the entry resolves to
    pub page: String,
    pub toc_page_title: String,
    pub md_page_title: String,
    /// URL of the entry containing this page
    pub section: String,
    /// URL of the page itself
    pub slug: String,
    pub issues: Vec<TocIssue>,
}

/// A `_data/toc/*.yml` document.
#[derive(Debug, Clone, Deserialize)]
pub struct TocDocument {
    pub version_number: VersionValue,
    #[serde(default)]
    pub contents: Vec<TocEntry>,
}

impl TocDocument {
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Normalized version this document describes (`15`, `1.5`, `docs`).
    pub fn version(&self) -> String {
        self.version_number.normalized()
    }
}

/// A section or page of a ToC document. Sections and pages share a shape:
/// both have a URL and may nest further pages.
#[derive(Debug, Clone, Deserialize)]
pub struct TocEntry {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub external: Option<serde_yaml::Value>,
    #[serde(default)]
    pub pages: Option<Vec<TocEntry>>,
}

/// Front-matter title: the text after `title: ` on the second line, with
/// quotes stripped. Empty when there is no such line.
pub fn page_title(lines: &[String]) -> String {
    lines
        .get(1)
        .and_then(|line| line.split(TITLE_MARKER).nth(1))
        .map(|title| title.trim().trim_matches('"').to_string())
        .unwrap_or_default()
}

/// Redirect target declared in a redirect stub's front matter.
pub fn redirect_target(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| line.strip_prefix(PAGE_PATH_MARKER))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Everything a ToC predicate needs to judge one entry.
pub struct TocContext<'a> {
    pub page_path: &'a Path,
    pub toc_title: &'a str,
    pub md_title: &'a str,
    /// The entry belongs to the hub's latest version and needs a redirect
    pub needs_redirect: bool,
    pub redirect_names: &'a BTreeSet<String>,
}

fn is_page_missing(ctx: &TocContext) -> bool {
    !ctx.page_path.exists()
}

fn is_title_mismatch(ctx: &TocContext) -> bool {
    ctx.toc_title != ctx.md_title
}

fn is_redirect_missing(ctx: &TocContext) -> bool {
    let name = ctx
        .page_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    ctx.needs_redirect && !ctx.redirect_names.contains(&name)
}

pub type TocCheck = fn(&TocContext<'_>) -> bool;

/// ToC predicates in display precedence order.
pub const TOC_ISSUES: &[(TocIssue, TocCheck)] = &[
    (TocIssue::PageMissing, is_page_missing),
    (TocIssue::TitleMismatch, is_title_mismatch),
    (TocIssue::RedirectMissing, is_redirect_missing),
];

/// Redirect and coverage findings for a hub's latest version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectReport {
    /// Version directory the findings refer to
    pub version: String,
    /// `stub -> target` for redirects whose target does not exist
    pub broken: Vec<String>,
    /// Latest-version pages no redirect points at
    pub missing: Vec<String>,
    /// Latest-version pages the ToC never reaches
    pub not_in_toc: Vec<String>,
}

impl RedirectReport {
    /// Broken redirects fail the run; the other lists are informational.
    pub fn has_failures(&self) -> bool {
        !self.broken.is_empty()
    }

    /// Report text for the hub summary.
    pub fn summary_text(&self) -> String {
        let mut text = String::new();
        let sections = [
            ("Broken redirects", &self.broken),
            ("Missing redirects", &self.missing),
            ("Pages not in ToC", &self.not_in_toc),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            text.push_str(&format!("\n  {} ({})\n  ----------\n", title, self.version));
            for item in items {
                text.push_str(&format!("  {}\n", item));
            }
        }
        text
    }
}

/// Results of a ToC run.
#[derive(Debug, Default)]
pub struct TocReport {
    pub pages: HubResults<TocPageRecord>,
    pub redirects: BTreeMap<String, RedirectReport>,
}

/// Hub-level options of the ToC check.
#[derive(Debug, Clone)]
pub struct TocOptions {
    /// Hubs whose latest version is not served through redirects
    pub redirect_exempt_hubs: Vec<String>,
    /// Directory name of the bill-of-materials subtree
    pub bom_dir: String,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            redirect_exempt_hubs: vec!["meta".to_string()],
            bom_dir: "bom".to_string(),
        }
    }
}

struct HubState {
    latest_dir: Option<String>,
    exempt: bool,
    redirect_names: BTreeSet<String>,
    /// Hub-relative paths of every page a ToC entry resolved to
    visited: BTreeSet<PathBuf>,
}

/// Checks ToC documents, redirects and ToC coverage.
pub struct TocChecker<'a> {
    discovery: &'a FileDiscovery,
    stable: &'a StableVersions,
    options: TocOptions,
}

impl<'a> TocChecker<'a> {
    pub fn new(discovery: &'a FileDiscovery, stable: &'a StableVersions, options: TocOptions) -> Self {
        Self {
            discovery,
            stable,
            options,
        }
    }

    pub fn check_all(&self, hubs: &[String]) -> Result<TocReport> {
        let mut report = TocReport::default();
        for hub in hubs {
            if !self.discovery.hub_exists(hub) {
                warn!(hub, "hub directory not found");
                report.pages.insert(hub.clone(), Vec::new());
                continue;
            }
            let (pages, redirects) = self.check_hub(hub)?;
            report.pages.insert(hub.clone(), pages);
            if let Some(redirects) = redirects {
                report.redirects.insert(hub.clone(), redirects);
            }
        }
        Ok(report)
    }

    /// Hubs whose latest version is not served through redirects.
    pub fn is_exempt(&self, hub: &str) -> bool {
        self.options.redirect_exempt_hubs.iter().any(|h| h == hub)
    }

    /// Latest version directory: the highest stable version, or the highest
    /// numbered directory on disk when the hub declares none.
    pub fn latest_version_dir(&self, hub: &str) -> Result<Option<String>> {
        if let Some(latest) = self.stable.latest(hub) {
            return self.discovery.find_version_dir(hub, &latest);
        }
        Ok(self
            .discovery
            .version_dirs(hub)?
            .into_iter()
            .filter_map(|dir| versions::version_number(&dir).map(|n| (n, dir)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, dir)| dir))
    }

    /// Check every ToC document of a hub, then its redirects.
    pub fn check_hub(&self, hub: &str) -> Result<(Vec<TocPageRecord>, Option<RedirectReport>)> {
        let hub_dir = self.discovery.hub_dir(hub);
        let toc_dir = hub_dir.join(TOC_DIR);
        if !toc_dir.is_dir() {
            return Err(CheckError::MissingInput { path: toc_dir });
        }
        info!("checking ToCs in {}", self.discovery.hub_title(hub));

        let mut state = HubState {
            latest_dir: self.latest_version_dir(hub)?,
            exempt: self.is_exempt(hub),
            redirect_names: redirect_stub_names(&hub_dir.join(REDIRECTS_DIR))?,
            visited: BTreeSet::new(),
        };

        let mut toc_files: Vec<PathBuf> = fs::read_dir(&toc_dir)
            .map_err(|e| CheckError::read(&toc_dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        toc_files.sort();

        let mut records = Vec::new();
        for toc_file in toc_files {
            let content =
                fs::read_to_string(&toc_file).map_err(|e| CheckError::read(&toc_file, e))?;
            let document =
                TocDocument::from_yaml(&content).map_err(|e| CheckError::yaml(&toc_file, e))?;
            records.extend(self.check_document(hub, &document, &mut state)?);
        }

        let redirects = match &state.latest_dir {
            Some(latest) => Some(self.check_redirects(hub, latest, &state.visited)?),
            None => None,
        };
        Ok((records, redirects))
    }

    fn check_document(
        &self,
        hub: &str,
        document: &TocDocument,
        state: &mut HubState,
    ) -> Result<Vec<TocPageRecord>> {
        let version_dir = self.discovery.version_dir_name(hub, &document.version())?;
        debug!(hub, version = %version_dir, "checking ToC document");

        let mut records = Vec::new();
        for section in &document.contents {
            let section_path = Path::new(&version_dir).join(&section.url);
            self.descend(hub, &version_dir, &section_path, section, state, &mut records)?;
        }
        Ok(records)
    }

    fn descend(
        &self,
        hub: &str,
        version_dir: &str,
        path: &Path,
        entry: &TocEntry,
        state: &mut HubState,
        records: &mut Vec<TocPageRecord>,
    ) -> Result<()> {
        let Some(pages) = &entry.pages else {
            return Ok(());
        };
        for page in pages {
            if page.external.is_some() {
                continue;
            }
            let page_path = path.join(&page.url);
            let mut page_file = page_path.clone().into_os_string();
            page_file.push(".md");
            let page_file = PathBuf::from(page_file);
            records.push(self.check_page(hub, version_dir, &page_file, page, &entry.url, state)?);
            self.descend(hub, version_dir, &page_path, page, state, records)?;
        }
        Ok(())
    }

    fn check_page(
        &self,
        hub: &str,
        version_dir: &str,
        page_file: &Path,
        page: &TocEntry,
        section_url: &str,
        state: &mut HubState,
    ) -> Result<TocPageRecord> {
        let absolute = self.discovery.hub_dir(hub).join(page_file);
        let md_title = if absolute.is_file() {
            page_title(&read_lines(&absolute)?)
        } else {
            String::new()
        };
        let toc_title = page.title.clone().unwrap_or_default();
        let is_latest = state.latest_dir.as_deref() == Some(version_dir);
        let ctx = TocContext {
            page_path: &absolute,
            toc_title: &toc_title,
            md_title: &md_title,
            needs_redirect: is_latest && !state.exempt,
            redirect_names: &state.redirect_names,
        };
        let classification = issues::classify(TOC_ISSUES, &ctx, TocIssue::is_advisory);
        if is_latest {
            state.visited.insert(page_file.to_path_buf());
        }

        Ok(TocPageRecord {
            status: classification.status,
            version: version_dir.to_string(),
            page: to_slash(page_file),
            toc_page_title: toc_title,
            md_page_title: md_title,
            section: section_url.to_string(),
            slug: page.url.clone(),
            issues: classification.issues,
        })
    }

    /// Broken and missing redirects, and latest-version pages outside the ToC.
    ///
    /// Exempt hubs only get the ToC coverage list.
    pub fn check_redirects(
        &self,
        hub: &str,
        latest_dir: &str,
        visited: &BTreeSet<PathBuf>,
    ) -> Result<RedirectReport> {
        let hub_dir = self.discovery.hub_dir(hub);
        let latest_pages: Vec<PathBuf> = self
            .discovery
            .markdown_files(hub)?
            .into_iter()
            .filter(|path| versions::version_of(path).as_deref() == Some(latest_dir))
            .collect();

        let mut report = RedirectReport {
            version: latest_dir.to_string(),
            ..RedirectReport::default()
        };
        let exempt = self.is_exempt(hub);
        let mut targets = BTreeSet::new();
        let stubs = if exempt {
            Vec::new()
        } else {
            redirect_stubs(&hub_dir.join(REDIRECTS_DIR))?
        };
        for (stub, target) in stubs {
            let mut target_file = join_target(Path::new(latest_dir), &target);
            if !is_markdown(&target_file) {
                let mut with_ext = target_file.into_os_string();
                with_ext.push(".md");
                target_file = PathBuf::from(with_ext);
            }
            if !hub_dir.join(&target_file).is_file() {
                report.broken.push(format!("{} -> {}", stub, target));
            }
            targets.insert(target_file);
        }

        for page in &latest_pages {
            if !exempt && !targets.contains(page) {
                report.missing.push(to_slash(page));
            }
            let in_bom = page
                .components()
                .any(|c| c.as_os_str() == self.options.bom_dir.as_str());
            if !visited.contains(page) && !in_bom {
                report.not_in_toc.push(to_slash(page));
            }
        }
        info!(
            hub,
            broken = report.broken.len(),
            missing = report.missing.len(),
            not_in_toc = report.not_in_toc.len(),
            "redirects checked"
        );
        Ok(report)
    }
}

fn markdown_stubs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stubs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| CheckError::read(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_markdown(path))
        .collect();
    stubs.sort();
    Ok(stubs)
}

fn redirect_stub_names(dir: &Path) -> Result<BTreeSet<String>> {
    Ok(markdown_stubs(dir)?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .collect())
}

/// `(stub file name, declared target)` for every redirect stub with a target.
fn redirect_stubs(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut stubs = Vec::new();
    for path in markdown_stubs(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match redirect_target(&read_lines(&path)?) {
            Some(target) => stubs.push((name, target)),
            None => debug!(stub = %name, "redirect stub without page_path"),
        }
    }
    Ok(stubs)
}
