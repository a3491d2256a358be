//! Link checking: resolve every extracted reference of a hub and classify it.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CheckError, Result};
use crate::extract::{self, Extraction, RawReference, ReferenceKind};
use crate::file_discovery::{FileDiscovery, MarkdownPage, join_target, to_slash};
use crate::issues::{self, Classification, Issue};
use crate::sections::SectionIndex;
use crate::summary::HubResults;
use crate::versions::{self, StableVersions};

/// Issues a link can have, in display precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkIssue {
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "doc:")]
    DocScheme,
    #[serde(rename = "self")]
    SameHub,
    #[serde(rename = "section_missing")]
    SectionMissing,
    #[serde(rename = "syntax_error")]
    SyntaxError,
}

impl Issue for LinkIssue {
    fn code(&self) -> &'static str {
        match self {
            LinkIssue::NotFound => "not_found",
            LinkIssue::DocScheme => "doc:",
            LinkIssue::SameHub => "self",
            LinkIssue::SectionMissing => "section_missing",
            LinkIssue::SyntaxError => "syntax_error",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LinkIssue::NotFound => "path not found",
            LinkIssue::DocScheme => "uses doc:",
            LinkIssue::SameHub => "uses an external link to its own hub",
            LinkIssue::SectionMissing => "section missing in linked file",
            LinkIssue::SyntaxError => "syntax error",
        }
    }
}

/// How a link target relates to the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
    Http,
    Other,
    Relative,
    Unknown,
}

impl LinkRelation {
    pub fn of(target: &str) -> Self {
        if target.starts_with("http") || target.starts_with("//cdn.") {
            LinkRelation::Http
        } else if target.starts_with("mailto:") || target.starts_with("localhost:") {
            LinkRelation::Other
        } else {
            LinkRelation::Relative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkRelation::Http => "http",
            LinkRelation::Other => "other",
            LinkRelation::Relative => "relative",
            LinkRelation::Unknown => "unknown",
        }
    }
}

/// Listing of the directory a missing link points into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AvailableFiles {
    Listing(Vec<String>),
    Placeholder(String),
}

/// One classified reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub status: String,
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    #[serde(rename = "link")]
    pub relation: LinkRelation,
    pub version: String,
    pub from: String,
    pub line_number: usize,
    pub to: String,
    pub to_absolute: Option<String>,
    pub text: String,
    pub full: String,
    pub issues: Vec<LinkIssue>,
    #[serde(
        rename = "available-sections",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub available_sections: Option<Vec<String>>,
    #[serde(
        rename = "available-files",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub available_files: Option<AvailableFiles>,
    /// Raw source line, kept for syntax errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

impl LinkRecord {
    pub fn is_ok(&self) -> bool {
        self.status == issues::OK
    }

    pub fn has_issue(&self, issue: LinkIssue) -> bool {
        self.issues.contains(&issue)
    }
}

/// Everything a link predicate needs to judge one target.
#[derive(Debug)]
pub struct LinkContext<'a> {
    pub target: &'a str,
    /// Directory of the page containing the link
    pub page_dir: &'a Path,
    /// File name of the page containing the link
    pub page_file: &'a str,
    pub hub: &'a str,
    /// Public documentation domain (`farm.bot`)
    pub site_domain: &'a str,
    pub sections: &'a SectionIndex,
}

impl LinkContext<'_> {
    /// Target without its fragment.
    pub fn path_part(&self) -> &str {
        self.target.split('#').next().unwrap_or("")
    }

    /// Fragment of the target: the text between the first and second `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.target.split('#').nth(1)
    }

    /// Path of the target relative to the page directory.
    pub fn target_path(&self) -> PathBuf {
        join_target(self.page_dir, self.path_part())
    }

    /// File whose sections a fragment refers to.
    pub fn section_file(&self) -> PathBuf {
        match self.path_part() {
            "" => self.page_dir.join(self.page_file),
            path => join_target(self.page_dir, path),
        }
    }
}

fn is_not_found(ctx: &LinkContext) -> bool {
    LinkRelation::of(ctx.target) == LinkRelation::Relative && !ctx.target_path().exists()
}

fn is_doc_link(ctx: &LinkContext) -> bool {
    ctx.target.starts_with("doc:")
}

/// An absolute URL back into the hub's own published docs.
///
/// The hub is recognized by the first three characters of its name at the
/// start of the host, and links to version listings (`.../docs/v15`) are
/// allowed.
fn is_same_hub(ctx: &LinkContext) -> bool {
    let link = ctx.target.to_lowercase();
    let http = link.contains("http");
    let on_site = link.contains(ctx.site_domain);
    let segments: Vec<&str> = link.split('/').collect();
    let hub_prefix: String = ctx.hub.to_lowercase().chars().take(3).collect();
    let has_hub = http
        && segments
            .get(2)
            .is_some_and(|host| host.starts_with(&hub_prefix));
    let top_link = link.ends_with(ctx.site_domain);
    let last = segments.last().copied().unwrap_or("");
    let second_to_last = if segments.len() > 1 {
        segments[segments.len() - 2]
    } else {
        ""
    };
    let version_link = versions::is_version_name(last) && second_to_last == "docs";
    http && on_site && has_hub && !top_link && !version_link
}

fn is_section_missing(ctx: &LinkContext) -> bool {
    match ctx.fragment() {
        Some(fragment) if ctx.target_path().exists() => {
            !ctx.sections.contains(&ctx.section_file(), fragment)
        }
        _ => false,
    }
}

/// Only the extractor reports syntax errors.
fn never(_: &LinkContext) -> bool {
    false
}

/// Predicate over a link context.
pub type LinkCheck = fn(&LinkContext<'_>) -> bool;

/// Link predicates in display precedence order.
pub const LINK_ISSUES: &[(LinkIssue, LinkCheck)] = &[
    (LinkIssue::NotFound, is_not_found),
    (LinkIssue::DocScheme, is_doc_link),
    (LinkIssue::SameHub, is_same_hub),
    (LinkIssue::SectionMissing, is_section_missing),
    (LinkIssue::SyntaxError, never),
];

/// Classify a link target.
///
/// `lenient_sections` suppresses `section_missing` from the status while
/// keeping it in the issue list.
pub fn classify_link(ctx: &LinkContext, lenient_sections: bool) -> Classification<LinkIssue> {
    issues::classify(LINK_ISSUES, ctx, |issue| {
        lenient_sections && issue == LinkIssue::SectionMissing
    })
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Checks links in every markdown page of a hub.
pub struct LinkChecker<'a> {
    discovery: &'a FileDiscovery,
    stable: &'a StableVersions,
    site_domain: String,
    /// Canonical corpus root, used to render resolved paths
    root: PathBuf,
}

impl<'a> LinkChecker<'a> {
    pub fn new(
        discovery: &'a FileDiscovery,
        stable: &'a StableVersions,
        site_domain: impl Into<String>,
    ) -> Self {
        let root = discovery
            .root()
            .canonicalize()
            .unwrap_or_else(|_| discovery.root().to_path_buf());
        Self {
            discovery,
            stable,
            site_domain: site_domain.into(),
            root,
        }
    }

    /// Check every hub in `hubs`; hubs missing on disk get an empty list.
    pub fn check_all(&self, hubs: &[String]) -> Result<HubResults<LinkRecord>> {
        let mut results = HubResults::new();
        for hub in hubs {
            let records = if self.discovery.hub_exists(hub) {
                self.check_hub(hub)?
            } else {
                Vec::new()
            };
            results.insert(hub.clone(), records);
        }
        Ok(results)
    }

    /// Index sections of the hub, then classify every reference in it.
    pub fn check_hub(&self, hub: &str) -> Result<Vec<LinkRecord>> {
        info!("checking links in {}", self.discovery.hub_title(hub));
        let pages = self.discovery.markdown_pages(hub)?;
        let index = SectionIndex::build(&pages);
        debug!(hub, files = index.len(), "section index built");

        let mut records = Vec::new();
        for page in &pages {
            records.extend(self.check_page(hub, page, &index)?);
        }
        let broken = records.iter().filter(|r| !r.is_ok()).count();
        info!(hub, total = records.len(), broken, "links checked");
        Ok(records)
    }

    /// Classify every reference of one page, in line order.
    ///
    /// Line numbers count from zero.
    pub fn check_page(
        &self,
        hub: &str,
        page: &MarkdownPage,
        index: &SectionIndex,
    ) -> Result<Vec<LinkRecord>> {
        let mut records = Vec::new();
        for (line_number, line) in page.lines.iter().enumerate() {
            let extractions = extract::extract_line(line).map_err(|e| CheckError::UnknownTag {
                tag: e.tag,
                file: page.display_path(),
                line_number,
            })?;
            for extraction in extractions {
                let record = match extraction {
                    Extraction::Reference(reference) => {
                        self.check_reference(hub, page, index, reference, line_number)
                    }
                    Extraction::SyntaxError => {
                        debug!(file = %page.display_path(), line_number, "invalid link syntax");
                        syntax_error_record(page, line, line_number)
                    }
                };
                records.push(record);
            }
        }
        Ok(records)
    }

    fn check_reference(
        &self,
        hub: &str,
        page: &MarkdownPage,
        index: &SectionIndex,
        reference: RawReference,
        line_number: usize,
    ) -> LinkRecord {
        let page_file = page.filename();
        let ctx = LinkContext {
            target: &reference.target,
            page_dir: page.dir(),
            page_file: &page_file,
            hub,
            site_domain: &self.site_domain,
            sections: index,
        };
        let lenient_sections = self.stable.is_stable(hub, &page.version) == Some(false);
        let classification = classify_link(&ctx, lenient_sections);

        let available_sections = classification
            .issues
            .contains(&LinkIssue::SectionMissing)
            .then(|| index.sections_for(&ctx.section_file()).to_vec());
        let available_files = classification
            .issues
            .contains(&LinkIssue::NotFound)
            .then(|| self.available_files(&ctx.target_path()));
        let relation = LinkRelation::of(&reference.target);
        let to_absolute = (relation == LinkRelation::Relative).then(|| self.local_path(&ctx));

        LinkRecord {
            status: classification.status,
            kind: reference.kind,
            relation,
            version: page.version.clone(),
            from: page.display_path(),
            line_number,
            to: reference.target.clone(),
            to_absolute,
            text: reference.text,
            full: reference.full,
            issues: classification.issues,
            available_sections,
            available_files,
            line: None,
        }
    }

    /// Resolved target rendered relative to the corpus root.
    fn local_path(&self, ctx: &LinkContext) -> String {
        let page_dir = ctx
            .page_dir
            .canonicalize()
            .unwrap_or_else(|_| ctx.page_dir.to_path_buf());
        let target = match ctx.path_part() {
            "" => ctx.page_file,
            path => path,
        };
        let resolved = normalize_path(&join_target(&page_dir, target));
        match resolved.strip_prefix(&self.root) {
            Ok(relative) => to_slash(relative),
            Err(_) => resolved.to_string_lossy().to_string(),
        }
    }

    fn available_files(&self, target_path: &Path) -> AvailableFiles {
        let dir = target_path.parent().unwrap_or(target_path);
        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().to_string())
                    .collect();
                names.sort();
                AvailableFiles::Listing(names)
            }
            Err(_) => AvailableFiles::Placeholder(format!("DIR NOT FOUND ('{}')", dir.display())),
        }
    }
}

fn syntax_error_record(page: &MarkdownPage, line: &str, line_number: usize) -> LinkRecord {
    let issues = vec![LinkIssue::SyntaxError];
    LinkRecord {
        status: LinkIssue::SyntaxError.label().to_string(),
        kind: ReferenceKind::Unknown,
        relation: LinkRelation::Unknown,
        version: page.version.clone(),
        from: page.display_path(),
        line_number,
        to: "unknown".to_string(),
        to_absolute: Some("unknown".to_string()),
        text: "unknown".to_string(),
        full: line.to_string(),
        issues,
        available_sections: None,
        available_files: None,
        line: Some(line.to_string()),
    }
}

/// Check whether `code` names a link issue.
pub fn link_issue_from_code(code: &str) -> Option<LinkIssue> {
    issues::from_code(LINK_ISSUES, code)
}
