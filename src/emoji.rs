//! Emoji shortcode validation.
//!
//! Every `:name:` token on a markdown line is checked against the catalog of
//! names the site renderer knows (GitHub's gemoji aliases).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CheckError, Result};
use crate::file_discovery::{FileDiscovery, MarkdownPage};
use crate::http_client::AsyncHttpClient;
use crate::issues::{self, Issue};
use crate::summary::HubResults;
use crate::versions;

/// Source of the canonical emoji list when no cached copy exists.
pub const GEMOJI_URL: &str = "https://raw.githubusercontent.com/github/gemoji/master/db/emoji.json";

/// Numeric tokens that are real emoji names.
const NUMERIC_NAMES: [&str; 2] = ["100", "1234"];

/// Tokens that look like shortcodes but never are.
const IGNORED_NAMES: [&str; 1] = ["backups"];

/// Names that legitimately contain a hyphen.
const HYPHENATED_NAMES: [&str; 4] = ["-1", "t-rex", "e-mail", "non-potable_water"];

/// Issues an emoji token can have, in display precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiIssue {
    NotAvailable,
    UsesHyphens,
}

impl Issue for EmojiIssue {
    fn code(&self) -> &'static str {
        match self {
            EmojiIssue::NotAvailable => "not_available",
            EmojiIssue::UsesHyphens => "uses_hyphens",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EmojiIssue::NotAvailable => "not available",
            EmojiIssue::UsesHyphens => "uses hyphens instead of underscores",
        }
    }
}

/// One checked `:name:` occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiRecord {
    pub status: String,
    /// Numeric version of the page, `None` for unversioned content
    pub version: Option<f64>,
    pub from: String,
    pub line_number: usize,
    pub emoji: String,
    pub issues: Vec<EmojiIssue>,
}

/// Names known to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmojiCatalog {
    names: BTreeSet<String>,
}

#[derive(Deserialize)]
struct GemojiEntry {
    #[serde(default)]
    aliases: Vec<String>,
}

impl EmojiCatalog {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a cached JSON list of names.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CheckError::read(path, e))?;
        let names: Vec<String> =
            serde_json::from_str(&content).map_err(|e| CheckError::json(path, e))?;
        Ok(Self::from_names(names))
    }

    /// Flatten the aliases of a gemoji `emoji.json` document.
    pub fn from_gemoji(content: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let entries: Vec<GemojiEntry> = serde_json::from_slice(content)?;
        Ok(Self::from_names(
            entries.into_iter().flat_map(|entry| entry.aliases),
        ))
    }

    /// Write the sorted name list.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| CheckError::write(parent, e))?;
        }
        let names: Vec<&String> = self.names.iter().collect();
        let json = serde_json::to_string_pretty(&names)?;
        fs::write(path, json).map_err(|e| CheckError::write(path, e))
    }

    /// Use the cached list at `path`, or download it from `url` and cache it.
    pub async fn load_or_fetch(path: &Path, url: &str, client: &AsyncHttpClient) -> Result<Self> {
        if path.exists() {
            debug!(path = %path.display(), "using cached emoji names");
            return Self::load(path);
        }
        info!(url, "downloading emoji names");
        let body = client.download(url).await?;
        let catalog = Self::from_gemoji(&body).map_err(|e| CheckError::json(url, e))?;
        catalog.save(path)?;
        Ok(catalog)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A shortcode candidate with the catalog it is judged against.
pub struct EmojiContext<'a> {
    pub name: &'a str,
    pub catalog: &'a EmojiCatalog,
}

fn is_not_available(ctx: &EmojiContext) -> bool {
    !ctx.catalog.contains(ctx.name)
}

fn uses_hyphens(ctx: &EmojiContext) -> bool {
    ctx.name.contains('-') && !HYPHENATED_NAMES.contains(&ctx.name)
}

pub type EmojiCheck = fn(&EmojiContext<'_>) -> bool;

/// Emoji predicates in display precedence order.
pub const EMOJI_ISSUES: &[(EmojiIssue, EmojiCheck)] = &[
    (EmojiIssue::NotAvailable, is_not_available),
    (EmojiIssue::UsesHyphens, uses_hyphens),
];

fn is_shortcode_text(token: &str) -> bool {
    !token.is_empty()
        && token
            .to_lowercase()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '_'))
}

/// Shortcode names on a line.
///
/// Colons pair up left to right (first with second, third with fourth, ...)
/// and the text of each pair is a candidate. Pure numbers other than the
/// numeric emoji names are skipped, as are known false positives.
pub fn scan_line(line: &str) -> Vec<&str> {
    let colons: Vec<usize> = line.match_indices(':').map(|(index, _)| index).collect();
    colons
        .chunks_exact(2)
        .map(|pair| &line[pair[0] + 1..pair[1]])
        .filter(|token| is_shortcode_text(token))
        .filter(|token| {
            !token.chars().all(|c| c.is_ascii_digit()) || NUMERIC_NAMES.contains(token)
        })
        .filter(|token| !IGNORED_NAMES.contains(token))
        .collect()
}

/// Checks emoji shortcodes and remembers which names were used.
pub struct EmojiChecker<'a> {
    discovery: &'a FileDiscovery,
    catalog: &'a EmojiCatalog,
    used: BTreeSet<String>,
    bad: BTreeSet<String>,
}

impl<'a> EmojiChecker<'a> {
    pub fn new(discovery: &'a FileDiscovery, catalog: &'a EmojiCatalog) -> Self {
        Self {
            discovery,
            catalog,
            used: BTreeSet::new(),
            bad: BTreeSet::new(),
        }
    }

    /// Check every hub in `hubs`; hubs missing on disk get an empty list.
    pub fn check_all(&mut self, hubs: &[String]) -> Result<HubResults<EmojiRecord>> {
        let mut results = HubResults::new();
        for hub in hubs {
            let records = if self.discovery.hub_exists(hub) {
                self.check_hub(hub)?
            } else {
                warn!(hub, "hub directory not found");
                Vec::new()
            };
            results.insert(hub.clone(), records);
        }
        Ok(results)
    }

    pub fn check_hub(&mut self, hub: &str) -> Result<Vec<EmojiRecord>> {
        info!("checking emoji in {}", self.discovery.hub_title(hub));
        let mut records = Vec::new();
        for page in self.discovery.markdown_pages(hub)? {
            records.extend(self.check_page(&page));
        }
        Ok(records)
    }

    pub fn check_page(&mut self, page: &MarkdownPage) -> Vec<EmojiRecord> {
        let mut records = Vec::new();
        for (line_number, line) in page.lines.iter().enumerate() {
            for name in scan_line(line) {
                records.push(self.check_emoji(page, name, line_number));
            }
        }
        records
    }

    fn check_emoji(&mut self, page: &MarkdownPage, name: &str, line_number: usize) -> EmojiRecord {
        let ctx = EmojiContext {
            name,
            catalog: self.catalog,
        };
        let classification = issues::classify(EMOJI_ISSUES, &ctx, |_| false);
        if !classification.is_ok() {
            self.bad.insert(name.to_string());
        }
        self.used.insert(name.to_string());
        EmojiRecord {
            status: classification.status,
            version: versions::version_number(&page.version),
            from: page.display_path(),
            line_number,
            emoji: name.to_string(),
            issues: classification.issues,
        }
    }

    /// Every name seen so far.
    pub fn used_names(&self) -> &BTreeSet<String> {
        &self.used
    }

    /// Names that had at least one issue.
    pub fn bad_names(&self) -> &BTreeSet<String> {
        &self.bad
    }
}
