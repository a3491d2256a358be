mod common;

use std::fs;

use common::test_helpers::{HUB, TestFixtures, copy_corpus, hubs};
use docs_check::extract::ReferenceKind;
use docs_check::file_discovery::FileDiscovery;
use docs_check::links::{AvailableFiles, LinkChecker, LinkIssue, LinkRecord, LinkRelation};
use docs_check::sections::SectionIndex;
use docs_check::versions::StableVersions;

const PAGE: &str = "v1/docs/v1_docs.md";

fn check_fixture_hub(stable: &StableVersions) -> Vec<LinkRecord> {
    let fixtures = TestFixtures::new();
    let discovery = fixtures.discovery();
    let checker = LinkChecker::new(&discovery, stable, "farm.bot");
    checker.check_hub(HUB).unwrap()
}

fn at_line(records: &[LinkRecord], line_number: usize) -> &LinkRecord {
    records
        .iter()
        .find(|r| r.line_number == line_number)
        .unwrap_or_else(|| panic!("no record on line {}", line_number))
}

#[test]
fn test_fixture_hub_counts() {
    let records = check_fixture_hub(&TestFixtures::new().stable_versions());

    assert_eq!(records.len(), 22);
    assert_eq!(records.iter().filter(|r| r.is_ok()).count(), 15);

    let targets: Vec<&str> = records.iter().map(|r| r.to.as_str()).collect();
    assert_eq!(
        targets,
        vec![
            "v1_docs.md",
            "../docs/v1_docs.md#v1-docs",
            "#v1-docs",
            "../docs/v1_docs.md#v2-docs",
            "v1_docs.md",
            "../../v2/docs/v2_docs.md",
            "../docs/v1_docs.md",
            "doc:page",
            "mailto:email",
            "unknown",
            "v1_docs.md",
            "https://www.youtube.com/embed/abc",
            "https://example.com/photo.png",
            "https://example.com/page",
            "../_images/pic.png",
            "broken image (odd).JPG",
            "https://example.com/image.png",
            "https://example.com/link",
            "https://test.farm.bot",
            "https://test.farm.bot/v1.0",
            "https://test.farm.bot/page",
            "#no-such-section",
        ]
    );
    assert!(records.iter().all(|r| r.from == PAGE && r.version == "v1"));

    let broken: Vec<usize> = records
        .iter()
        .filter(|r| !r.is_ok())
        .map(|r| r.line_number)
        .collect();
    assert_eq!(broken, vec![9, 13, 15, 21, 25, 26, 27]);
}

#[test]
fn test_broken_link_issues() {
    let records = check_fixture_hub(&TestFixtures::new().stable_versions());

    let wrong_section = at_line(&records, 9);
    assert_eq!(wrong_section.issues, vec![LinkIssue::SectionMissing]);
    assert_eq!(wrong_section.status, "section missing in linked file");
    assert_eq!(
        wrong_section.available_sections,
        Some(vec!["v1-docs".to_string()])
    );

    let doc_scheme = at_line(&records, 13);
    assert_eq!(
        doc_scheme.issues,
        vec![LinkIssue::NotFound, LinkIssue::DocScheme]
    );
    assert_eq!(doc_scheme.status, "path not found");
    assert_eq!(
        doc_scheme.available_files,
        Some(AvailableFiles::Listing(vec!["v1_docs.md".to_string()]))
    );

    let syntax = at_line(&records, 15);
    assert_eq!(syntax.issues, vec![LinkIssue::SyntaxError]);
    assert_eq!(syntax.kind, ReferenceKind::Unknown);
    assert_eq!(syntax.to, "unknown");
    assert_eq!(syntax.line.as_deref(), Some("broken syntax](v1_docs.md)"));

    let missing_image = at_line(&records, 21);
    assert_eq!(missing_image.issues, vec![LinkIssue::NotFound]);
    assert_eq!(missing_image.kind, ReferenceKind::Image);
    assert_eq!(missing_image.to, "broken image (odd).JPG");

    for line_number in [25, 26] {
        let same_hub = at_line(&records, line_number);
        assert_eq!(same_hub.issues, vec![LinkIssue::SameHub]);
        assert_eq!(same_hub.status, "uses an external link to its own hub");
    }

    assert_eq!(
        at_line(&records, 27).issues,
        vec![LinkIssue::SectionMissing]
    );
}

#[test]
fn test_ok_references() {
    let records = check_fixture_hub(&TestFixtures::new().stable_versions());

    let site_root = at_line(&records, 24);
    assert!(site_root.is_ok());
    assert_eq!(site_root.relation, LinkRelation::Http);
    assert_eq!(site_root.to_absolute, None);

    assert_eq!(at_line(&records, 14).relation, LinkRelation::Other);
    assert_eq!(at_line(&records, 16).text, "link with (parens) text");

    let iframe = at_line(&records, 17);
    assert_eq!(iframe.kind, ReferenceKind::Iframe);
    assert_eq!(iframe.to, "https://www.youtube.com/embed/abc");

    assert_eq!(at_line(&records, 18).kind, ReferenceKind::Image);
    assert_eq!(at_line(&records, 19).kind, ReferenceKind::Link);

    let image = at_line(&records, 20);
    assert!(image.is_ok());
    assert_eq!(image.full, "![local image](../_images/pic.png)");
    assert_eq!(
        image.to_absolute.as_deref(),
        Some("farmbot-test/v1/_images/pic.png")
    );

    assert_eq!(
        at_line(&records, 11).to_absolute.as_deref(),
        Some("farmbot-test/v2/docs/v2_docs.md")
    );
    assert_eq!(
        at_line(&records, 8).to_absolute.as_deref(),
        Some("farmbot-test/v1/docs/v1_docs.md")
    );
}

#[test]
fn test_unstable_version_keeps_section_issue_but_not_status() {
    let stable = StableVersions::from_pairs([("test", &["2"][..])]);
    let records = check_fixture_hub(&stable);

    let wrong_section = at_line(&records, 9);
    assert!(wrong_section.is_ok());
    assert!(wrong_section.has_issue(LinkIssue::SectionMissing));
    assert!(at_line(&records, 27).is_ok());
    assert_eq!(records.iter().filter(|r| !r.is_ok()).count(), 5);
}

#[test]
fn test_check_all_includes_absent_hubs() {
    let fixtures = TestFixtures::new();
    let discovery = fixtures.discovery();
    let stable = fixtures.stable_versions();
    let checker = LinkChecker::new(&discovery, &stable, "farm.bot");

    let mut requested = hubs();
    requested.push("absent".to_string());
    let results = checker.check_all(&requested).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results["test"].len(), 22);
    assert!(results["absent"].is_empty());
}

#[test]
fn test_leading_slash_target_resolves_in_page_dir() {
    let fixtures = TestFixtures::new();
    let corpus = copy_corpus(&fixtures);
    fs::write(
        corpus.path().join("farmbot-test/v1/docs/rooted.md"),
        "# Rooted\n[rooted](/v1_docs.md#v1-docs)\n[gone](/gone.md)\n",
    )
    .unwrap();

    let discovery = FileDiscovery::new(corpus.path(), "farmbot-");
    let stable = fixtures.stable_versions();
    let records = LinkChecker::new(&discovery, &stable, "farm.bot")
        .check_hub(HUB)
        .unwrap();
    let rooted: Vec<&LinkRecord> = records
        .iter()
        .filter(|r| r.from == "v1/docs/rooted.md")
        .collect();

    assert_eq!(rooted.len(), 2);
    assert!(rooted[0].is_ok());
    assert_eq!(rooted[0].line_number, 1);
    assert_eq!(
        rooted[0].to_absolute.as_deref(),
        Some("farmbot-test/v1/docs/v1_docs.md")
    );
    assert_eq!(rooted[1].issues, vec![LinkIssue::NotFound]);
}

#[test]
fn test_section_index_is_idempotent() {
    let discovery = TestFixtures::new().discovery();
    let pages = discovery.markdown_pages(HUB).unwrap();

    let first = SectionIndex::build(&pages);
    let second = SectionIndex::build(&pages);
    assert_eq!(first, second);

    let mut rebuilt = first.clone();
    for page in &pages {
        rebuilt.add_page(&page.path, &page.lines);
    }
    assert_eq!(rebuilt, first);
    assert_eq!(first.len(), 2);
}
