//! Human readable report
//!
//! Renders the per-hub summary of a run: extra text blocks first, then the
//! link, emoji and ToC summaries of every checker that ran, then a verdict.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use crate::cli::VerbosityLevel;
use crate::emoji::{EMOJI_ISSUES, EmojiRecord};
use crate::extract::ReferenceKind;
use crate::issues::Issue;
use crate::links::{AvailableFiles, LINK_ISSUES, LinkIssue, LinkRecord, LinkRelation};
use crate::summary::{Counts, HubResults, Summary};
use crate::toc::{TOC_ISSUES, TocIssue, TocPageRecord};

const BOLD: &str = "1";
const RED: &str = "31";
const GREEN: &str = "32";

/// Issue columns shown per reference kind and relation, in display order.
const LINK_ISSUE_COLUMNS: &[(ReferenceKind, &[(LinkRelation, &[LinkIssue])])] = &[
    (
        ReferenceKind::Link,
        &[
            (
                LinkRelation::Relative,
                &[
                    LinkIssue::NotFound,
                    LinkIssue::DocScheme,
                    LinkIssue::SectionMissing,
                ],
            ),
            (LinkRelation::Http, &[LinkIssue::SameHub]),
            (LinkRelation::Other, &[]),
        ],
    ),
    (
        ReferenceKind::Image,
        &[
            (LinkRelation::Relative, &[LinkIssue::NotFound]),
            (LinkRelation::Http, &[]),
        ],
    ),
    (ReferenceKind::Iframe, &[(LinkRelation::Http, &[])]),
    (ReferenceKind::Source, &[(LinkRelation::Http, &[])]),
    (ReferenceKind::Script, &[(LinkRelation::Http, &[])]),
];

/// Centered, upper-cased section title padded with dashes.
pub fn banner(text: &str) -> String {
    format!("{:-^50}", format!(" {} ", text.to_uppercase()))
}

/// Limits applied to the broken link listing.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Broken `link` records listed per hub
    pub max_link_issues: Option<usize>,
    /// Broken `image` records listed per hub
    pub max_image_issues: Option<usize>,
    /// Only list broken links having this issue
    pub issue_filter: Option<LinkIssue>,
}

impl ReportOptions {
    fn max_for(&self, kind: ReferenceKind) -> Option<usize> {
        match kind {
            ReferenceKind::Link => self.max_link_issues,
            ReferenceKind::Image => self.max_image_issues,
            _ => None,
        }
    }
}

/// Report formatter for the terminal
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
    hub_prefix: String,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, hub_prefix: impl Into<String>) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
            hub_prefix: hub_prefix.into(),
        }
    }

    /// Force colors on or off regardless of the terminal.
    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Hubs worth reporting: those with any record or extra output.
    fn reported_hubs(&self, summary: &Summary) -> Vec<String> {
        fn has_records<T>(results: &Option<HubResults<T>>, hub: &str) -> bool {
            results
                .as_ref()
                .and_then(|r| r.get(hub))
                .is_some_and(|items| !items.is_empty())
        }
        summary
            .hubs()
            .into_iter()
            .filter(|hub| {
                has_records(&summary.links, hub)
                    || has_records(&summary.emoji, hub)
                    || has_records(&summary.toc, hub)
                    || summary
                        .extras
                        .get(hub)
                        .is_some_and(|extras| !extras.text.is_empty() || !extras.failures.is_empty())
            })
            .collect()
    }

    pub fn format_report(&self, summary: &Summary, options: &ReportOptions) -> String {
        let mut output = String::new();

        if self.verbosity > VerbosityLevel::Quiet {
            for hub in self.reported_hubs(summary) {
                let title = format!("{}{}", self.hub_prefix, hub);
                output.push_str(&self.colorize(&title, BOLD));
                output.push_str("\n\n");
                if let Some(extras) = summary.extras.get(&hub) {
                    output.push_str(&extras.text);
                    if self.verbosity >= VerbosityLevel::Verbose {
                        for failure in &extras.failures {
                            output.push_str(&format!("failed: {}\n", failure));
                        }
                    }
                }
                output.push('\n');
                if let Some(links) = &summary.links {
                    output.push_str(&self.format_link_summary(hub_records(links, &hub), options));
                }
                if let Some(emoji) = &summary.emoji {
                    output.push_str(&self.format_emoji_summary(hub_records(emoji, &hub)));
                }
                if let Some(toc) = &summary.toc {
                    output.push_str(&self.format_toc_summary(hub_records(toc, &hub)));
                }
            }
            output.push('\n');
        }

        output.push_str(&self.format_verdict(summary));
        output
    }

    pub fn format_verdict(&self, summary: &Summary) -> String {
        if summary.has_issues() {
            format!("{}\n", self.colorize("Issues found.", RED))
        } else {
            format!("{}\n", self.colorize("No issues found.", GREEN))
        }
    }

    pub fn format_link_summary(&self, links: &[LinkRecord], options: &ReportOptions) -> String {
        let mut output = String::from("\n\n");
        output.push_str(&banner("link summary"));
        output.push('\n');
        output.push_str(&format_issue_counts(links, None));
        for (kind, relations) in LINK_ISSUE_COLUMNS {
            for (relation, columns) in relations.iter() {
                output.push_str(&format_issue_counts(links, Some((*kind, *relation, *columns))));
            }
        }
        output.push('\n');
        output.push_str(&self.format_broken_links(links, options));
        output.push_str("\n\n");
        output
    }

    pub fn format_broken_links(&self, links: &[LinkRecord], options: &ReportOptions) -> String {
        let mut output = String::new();
        let broken: Vec<&LinkRecord> = links.iter().filter(|link| !link.is_ok()).collect();
        if !broken.is_empty() {
            output.push_str(&self.colorize(&banner("broken links"), BOLD));
            output.push('\n');
        }

        let mut printed: HashMap<ReferenceKind, usize> = HashMap::new();
        let mut eligible: HashMap<ReferenceKind, usize> = HashMap::new();
        for link in &broken {
            if let Some(filter) = options.issue_filter
                && !link.has_issue(filter)
            {
                continue;
            }
            *eligible.entry(link.kind).or_default() += 1;
            let count = printed.entry(link.kind).or_default();
            if options.max_for(link.kind).is_some_and(|max| *count >= max) {
                continue;
            }
            *count += 1;
            output.push('\n');
            output.push_str(&self.format_link_record(link));
        }

        let more = |kind: ReferenceKind| {
            eligible.get(&kind).copied().unwrap_or(0) - printed.get(&kind).copied().unwrap_or(0)
        };
        let (more_links, more_images) = (more(ReferenceKind::Link), more(ReferenceKind::Image));
        if more_links > 0 || more_images > 0 {
            output.push_str(&format!(
                "\n+ {} links and {} images not shown\n",
                more_links, more_images
            ));
        }
        if let Some(filter) = options.issue_filter {
            output.push_str(&format!(
                "\n(only links with '{}' issue displayed)\n",
                filter.code()
            ));
        }
        output
    }

    fn format_link_record(&self, link: &LinkRecord) -> String {
        let mut fields: Vec<(&str, String)> = vec![
            ("status", link.status.clone()),
            ("type", link.kind.as_str().to_string()),
            ("link", link.relation.as_str().to_string()),
            ("from", link.from.clone()),
            ("line_number", link.line_number.to_string()),
            ("to", link.to.clone()),
            ("text", link.text.clone()),
            ("full", self.colorize(&link.full, RED)),
            ("issues", issue_codes(&link.issues)),
        ];
        if let Some(sections) = &link.available_sections {
            fields.push(("available-sections", format!("[{}]", sections.join(", "))));
        }
        if let Some(files) = &link.available_files {
            let value = match files {
                AvailableFiles::Listing(names) => {
                    let mut names = names.clone();
                    names.sort();
                    serde_json::to_string_pretty(&names).unwrap_or_default()
                }
                AvailableFiles::Placeholder(text) => text.clone(),
            };
            fields.push(("available-files", value));
        }
        if let Some(line) = &link.line {
            fields.push(("line", line.clone()));
        }
        fields
            .into_iter()
            .map(|(key, value)| format!("{:<19}: {}\n", key, value))
            .collect()
    }

    pub fn format_emoji_summary(&self, emojis: &[EmojiRecord]) -> String {
        let mut output = String::from("\n\n");
        output.push_str(&banner("emoji summary"));
        output.push('\n');

        let unique: BTreeSet<&str> = emojis.iter().map(|e| e.emoji.as_str()).collect();
        output.push_str(&format!("{:>6} total ({} unique)\n", emojis.len(), unique.len()));
        output.push_str(&format!(
            "       {}\n",
            unique.into_iter().collect::<Vec<_>>().join(", ")
        ));
        output.push_str("  ----------\n");
        output.push_str(&format!("{:>6} ok\n", Counts::of(emojis).ok));
        for (issue, _) in EMOJI_ISSUES {
            let count = emojis.iter().filter(|e| e.issues.contains(issue)).count();
            output.push_str(&format!("{:>6} {}\n", count, issue.label()));
        }
        output.push('\n');

        let broken: Vec<&EmojiRecord> = emojis.iter().filter(|e| e.status != crate::issues::OK).collect();
        if !broken.is_empty() {
            output.push_str(&self.colorize(&banner("broken emojis"), BOLD));
            output.push('\n');
        }
        for emoji in broken {
            let fields = [
                ("status", emoji.status.clone()),
                ("from", emoji.from.clone()),
                ("line_number", emoji.line_number.to_string()),
                ("emoji", self.colorize(&emoji.emoji, RED)),
                ("issues", issue_codes(&emoji.issues)),
            ];
            for (key, value) in fields {
                output.push_str(&format!("{:<12}: {}\n", key, value));
            }
            output.push('\n');
        }
        output.push_str("\n\n");
        output
    }

    pub fn format_toc_summary(&self, pages: &[TocPageRecord]) -> String {
        let mut output = String::from("\n\n");
        output.push_str(&banner("ToC page summary"));
        output.push('\n');
        output.push_str(&format!("{:>6} total\n", pages.len()));
        output.push_str("  ----------\n");
        output.push_str(&format!("{:>6} ok\n", Counts::of(pages).ok));
        for (issue, _) in TOC_ISSUES {
            let count = pages.iter().filter(|p| p.issues.contains(issue)).count();
            output.push_str(&format!("{:>6} {}\n", count, issue.label()));
        }
        output.push('\n');

        let broken: Vec<&TocPageRecord> = pages.iter().filter(|p| p.status != crate::issues::OK).collect();
        if !broken.is_empty() {
            output.push_str(&self.colorize(&banner("broken ToC pages"), BOLD));
            output.push('\n');
        }
        for page in broken {
            let redirect_only = page.issues == [TocIssue::RedirectMissing];
            let needs_redirect = page.issues.contains(&TocIssue::RedirectMissing);
            let fields = [
                ("status", page.status.clone()),
                ("slug", self.colorize_if(&page.slug, needs_redirect)),
                ("page", self.colorize_if(&page.page, !redirect_only)),
                ("toc_page_title", page.toc_page_title.clone()),
                ("md_page_title", page.md_page_title.clone()),
                ("section", page.section.clone()),
                ("issues", issue_codes(&page.issues)),
            ];
            for (key, value) in fields {
                output.push_str(&format!("{:<15}: {}\n", key, value));
            }
            output.push('\n');
        }
        output.push_str("\n\n");
        output
    }

    fn colorize_if(&self, text: &str, highlight: bool) -> String {
        if highlight {
            self.colorize(text, RED)
        } else {
            text.to_string()
        }
    }
}

fn hub_records<'a, T>(results: &'a HubResults<T>, hub: &str) -> &'a [T] {
    results.get(hub).map(Vec::as_slice).unwrap_or(&[])
}

fn issue_codes<K: Issue>(issues: &[K]) -> String {
    let codes: Vec<&str> = issues.iter().map(|issue| issue.code()).collect();
    format!("[{}]", codes.join(", "))
}

/// Counts of one reference kind and relation, or of every link when
/// `filter` is `None`.
fn format_issue_counts(
    links: &[LinkRecord],
    filter: Option<(ReferenceKind, LinkRelation, &[LinkIssue])>,
) -> String {
    let selected: Vec<&LinkRecord> = links
        .iter()
        .filter(|link| filter.is_none_or(|(kind, relation, _)| link.kind == kind && link.relation == relation))
        .collect();
    let all_issues: Vec<LinkIssue> = LINK_ISSUES.iter().map(|(issue, _)| *issue).collect();

    let mut output = String::from("\n");
    let columns: &[LinkIssue] = match filter {
        Some((kind, relation, columns)) => {
            output.push_str(&format!("{}s ({}):\n", kind.as_str(), relation.as_str()));
            output.push_str(&format!(
                "{:>6} total {}\n",
                selected.len(),
                count_details(&selected, kind, relation)
            ));
            columns
        }
        None => {
            output.push_str(&format!("{:>6} total\n", selected.len()));
            &all_issues
        }
    };
    output.push_str("  ----------\n");
    if !columns.is_empty() {
        let ok = selected.iter().filter(|link| link.issues.is_empty()).count();
        output.push_str(&format!("{:>6} ok\n", ok));
    }
    for issue in columns {
        let count: usize = selected
            .iter()
            .map(|link| link.issues.iter().filter(|i| *i == issue).count())
            .sum();
        output.push_str(&format!("{:>6} {}\n", count, issue.label()));
    }
    output
}

/// Extension counts for images, distinct sites for http targets, target
/// counts for other links.
fn count_details(links: &[&LinkRecord], kind: ReferenceKind, relation: LinkRelation) -> String {
    if links.is_empty() {
        return String::new();
    }
    let mut details = Vec::new();
    if kind == ReferenceKind::Image {
        let mut extensions: BTreeMap<String, usize> = BTreeMap::new();
        for link in links {
            let ext = link.to.rsplit('.').next().unwrap_or_default().to_lowercase();
            *extensions.entry(ext).or_default() += 1;
        }
        let counts: Vec<String> = extensions
            .iter()
            .map(|(ext, count)| format!("{}: {}", ext, count))
            .collect();
        details.push(format!("({})", counts.join(", ")));
    }
    if relation == LinkRelation::Http {
        let sites: BTreeSet<&str> = links
            .iter()
            .map(|link| link.to.split('/').nth(2).unwrap_or_default())
            .collect();
        details.push(format!("({} sites)", sites.len()));
    }
    if relation == LinkRelation::Other {
        let mut targets: BTreeMap<&str, usize> = BTreeMap::new();
        for link in links {
            *targets.entry(link.to.as_str()).or_default() += 1;
        }
        let mut sorted: Vec<(&str, usize)> = targets.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let mut listing = String::from("\n");
        for (target, count) in sorted {
            listing.push_str(&format!("{:>8}: {}\n", count, target));
        }
        details.push(listing.trim_end().to_string());
    }
    details.join(" ")
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiIssue;

    fn link(kind: ReferenceKind, relation: LinkRelation, to: &str, issues: Vec<LinkIssue>) -> LinkRecord {
        LinkRecord {
            status: issues
                .first()
                .map(|issue| issue.label().to_string())
                .unwrap_or_else(|| "ok".to_string()),
            kind,
            relation,
            version: "v1".to_string(),
            from: "v1/docs/page.md".to_string(),
            line_number: 3,
            to: to.to_string(),
            to_absolute: None,
            text: "text".to_string(),
            full: format!("[text]({})", to),
            issues,
            available_sections: None,
            available_files: None,
            line: None,
        }
    }

    fn plain() -> Output {
        Output::new(VerbosityLevel::Normal, "farmbot-").with_colors(false)
    }

    #[test]
    fn test_banner() {
        assert_eq!(banner("link summary").len(), 50);
        assert!(banner("link summary").contains(" LINK SUMMARY "));
        assert!(banner("x").starts_with("------"));
    }

    #[test]
    fn test_link_summary_counts() {
        let links = vec![
            link(ReferenceKind::Link, LinkRelation::Relative, "a.md", vec![]),
            link(ReferenceKind::Link, LinkRelation::Relative, "b.md", vec![LinkIssue::NotFound]),
            link(ReferenceKind::Image, LinkRelation::Relative, "_images/x.PNG", vec![]),
            link(ReferenceKind::Link, LinkRelation::Http, "https://farm.bot/docs", vec![LinkIssue::SameHub]),
            link(ReferenceKind::Link, LinkRelation::Other, "mailto:a@b.c", vec![]),
        ];
        let text = plain().format_link_summary(&links, &ReportOptions::default());
        assert!(text.contains("     5 total"));
        assert!(text.contains("links (relative):\n     2 total"));
        assert!(text.contains("images (relative):\n     1 total (png: 1)"));
        assert!(text.contains("(1 sites)"));
        assert!(text.contains("       1: mailto:a@b.c"));
        assert!(text.contains("     1 path not found"));
        assert!(text.contains("BROKEN LINKS"));
        assert!(text.contains("status             : path not found"));
    }

    #[test]
    fn test_broken_links_respect_max_counts() {
        let links: Vec<LinkRecord> = (0..3)
            .map(|i| {
                link(
                    ReferenceKind::Link,
                    LinkRelation::Relative,
                    &format!("missing{}.md", i),
                    vec![LinkIssue::NotFound],
                )
            })
            .collect();
        let options = ReportOptions {
            max_link_issues: Some(1),
            ..Default::default()
        };
        let text = plain().format_broken_links(&links, &options);
        assert!(text.contains("missing0.md"));
        assert!(!text.contains("missing1.md"));
        assert!(text.contains("+ 2 links and 0 images not shown"));
    }

    #[test]
    fn test_broken_links_issue_filter() {
        let links = vec![
            link(ReferenceKind::Link, LinkRelation::Relative, "gone.md", vec![LinkIssue::NotFound]),
            link(ReferenceKind::Link, LinkRelation::Relative, "doc:x", vec![LinkIssue::DocScheme]),
        ];
        let options = ReportOptions {
            issue_filter: Some(LinkIssue::DocScheme),
            ..Default::default()
        };
        let text = plain().format_broken_links(&links, &options);
        assert!(text.contains("doc:x"));
        assert!(!text.contains("gone.md"));
        assert!(text.contains("(only links with 'doc:' issue displayed)"));
    }

    #[test]
    fn test_emoji_summary() {
        let emojis = vec![
            EmojiRecord {
                status: "ok".to_string(),
                version: Some(1.0),
                from: "v1/docs/a.md".to_string(),
                line_number: 1,
                emoji: "+1".to_string(),
                issues: vec![],
            },
            EmojiRecord {
                status: "not available".to_string(),
                version: Some(1.0),
                from: "v1/docs/a.md".to_string(),
                line_number: 2,
                emoji: "abcde".to_string(),
                issues: vec![EmojiIssue::NotAvailable],
            },
        ];
        let text = plain().format_emoji_summary(&emojis);
        assert!(text.contains("     2 total (2 unique)"));
        assert!(text.contains("     1 ok"));
        assert!(text.contains("     1 not available"));
        assert!(text.contains("emoji       : abcde"));
        assert!(text.contains("issues      : [not_available]"));
    }

    #[test]
    fn test_report_verdict_and_quiet() {
        let mut summary = Summary::new();
        let mut results = HubResults::new();
        results.insert(
            "test".to_string(),
            vec![link(ReferenceKind::Link, LinkRelation::Relative, "gone.md", vec![LinkIssue::NotFound])],
        );
        results.insert("empty".to_string(), vec![]);
        summary.add_links(results).unwrap();

        let report = plain().format_report(&summary, &ReportOptions::default());
        assert!(report.contains("farmbot-test"));
        assert!(!report.contains("farmbot-empty"));
        assert!(report.ends_with("Issues found.\n"));

        let quiet = Output::new(VerbosityLevel::Quiet, "farmbot-")
            .with_colors(false)
            .format_report(&summary, &ReportOptions::default());
        assert_eq!(quiet, "Issues found.\n");

        assert_eq!(plain().format_verdict(&Summary::new()), "No issues found.\n");
    }

    #[test]
    fn test_colorize() {
        let output = Output::new(VerbosityLevel::Normal, "farmbot-").with_colors(true);
        assert_eq!(output.colorize("x", RED), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30.0s");
    }
}
