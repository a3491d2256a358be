mod common;

use std::fs;

use common::test_helpers::{HUB, TestFixtures, copy_corpus, hubs};
use docs_check::error::CheckError;
use docs_check::file_discovery::FileDiscovery;
use docs_check::toc::{TocChecker, TocIssue, TocOptions};
use docs_check::versions::StableVersions;
use tempfile::TempDir;

#[test]
fn test_fixture_hub_toc() {
    let fixtures = TestFixtures::new();
    let discovery = fixtures.discovery();
    let stable = fixtures.stable_versions();
    let checker = TocChecker::new(&discovery, &stable, TocOptions::default());

    assert_eq!(checker.latest_version_dir(HUB).unwrap().as_deref(), Some("v2"));

    let (records, redirects) = checker.check_hub(HUB).unwrap();
    assert_eq!(records.len(), 2);

    let present = &records[0];
    assert_eq!(present.status, "ok");
    assert_eq!(present.version, "v2");
    assert_eq!(present.page, "v2/docs/v2_docs.md");
    assert_eq!(present.section, "docs");
    assert_eq!(present.slug, "v2_docs");
    assert_eq!(present.md_page_title, "V2 Docs");
    assert!(present.issues.is_empty());

    let absent = &records[1];
    assert_eq!(absent.status, "missing page");
    assert_eq!(absent.md_page_title, "");
    assert_eq!(absent.toc_page_title, "Absent Page");
    assert_eq!(
        absent.issues,
        vec![
            TocIssue::PageMissing,
            TocIssue::TitleMismatch,
            TocIssue::RedirectMissing
        ]
    );

    let redirects = redirects.unwrap();
    assert_eq!(redirects.version, "v2");
    assert!(!redirects.has_failures());
    assert!(redirects.missing.is_empty());
    assert!(redirects.not_in_toc.is_empty());
    assert_eq!(redirects.summary_text(), "");
}

#[test]
fn test_exempt_hub_skips_redirects() {
    let fixtures = TestFixtures::new();
    let discovery = fixtures.discovery();
    let stable = fixtures.stable_versions();
    let options = TocOptions {
        redirect_exempt_hubs: vec![HUB.to_string()],
        ..TocOptions::default()
    };
    let checker = TocChecker::new(&discovery, &stable, options);

    let report = checker.check_all(&hubs()).unwrap();
    assert_eq!(
        report.pages[HUB][1].issues,
        vec![TocIssue::PageMissing, TocIssue::TitleMismatch]
    );

    let redirects = &report.redirects[HUB];
    assert!(redirects.broken.is_empty());
    assert!(redirects.missing.is_empty());
    assert!(redirects.not_in_toc.is_empty());
}

#[test]
fn test_exempt_hub_still_lists_pages_not_in_toc() {
    let fixtures = TestFixtures::new();
    let corpus = copy_corpus(&fixtures);
    let hub_dir = corpus.path().join("farmbot-test");
    fs::write(hub_dir.join("v2/docs/orphan.md"), "---\ntitle: Orphan\n---\n").unwrap();
    fs::write(
        hub_dir.join("_redirects/gone.md"),
        "---\npage_path: docs/gone\n---\n",
    )
    .unwrap();

    let discovery = FileDiscovery::new(corpus.path(), "farmbot-");
    let stable = fixtures.stable_versions();
    let options = TocOptions {
        redirect_exempt_hubs: vec![HUB.to_string()],
        ..TocOptions::default()
    };
    let checker = TocChecker::new(&discovery, &stable, options);
    let (_, redirects) = checker.check_hub(HUB).unwrap();
    let redirects = redirects.unwrap();

    assert_eq!(redirects.not_in_toc, vec!["v2/docs/orphan.md"]);
    assert!(redirects.broken.is_empty());
    assert!(redirects.missing.is_empty());
    assert!(!redirects.has_failures());
}

#[test]
fn test_broken_redirect_and_uncovered_page() {
    let fixtures = TestFixtures::new();
    let corpus = copy_corpus(&fixtures);
    let hub_dir = corpus.path().join("farmbot-test");
    fs::write(
        hub_dir.join("_redirects/gone.md"),
        "---\npage_path: docs/gone\n---\n",
    )
    .unwrap();
    fs::write(
        hub_dir.join("v2/docs/hidden.md"),
        "---\ntitle: Hidden\n---\n",
    )
    .unwrap();

    let discovery = FileDiscovery::new(corpus.path(), "farmbot-");
    let stable = fixtures.stable_versions();
    let checker = TocChecker::new(&discovery, &stable, TocOptions::default());
    let (_, redirects) = checker.check_hub(HUB).unwrap();
    let redirects = redirects.unwrap();

    assert!(redirects.has_failures());
    assert_eq!(redirects.broken, vec!["gone.md -> docs/gone"]);
    assert_eq!(redirects.missing, vec!["v2/docs/hidden.md"]);
    assert_eq!(redirects.not_in_toc, vec!["v2/docs/hidden.md"]);

    let text = redirects.summary_text();
    assert!(text.contains("Broken redirects (v2)"));
    assert!(text.contains("Pages not in ToC (v2)"));
}

#[test]
fn test_missing_toc_directory_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("farmbot-bare/v1")).unwrap();

    let discovery = FileDiscovery::new(temp_dir.path(), "farmbot-");
    let stable = StableVersions::default();
    let checker = TocChecker::new(&discovery, &stable, TocOptions::default());

    let error = checker.check_all(&["bare".to_string()]).unwrap_err();
    assert!(matches!(error, CheckError::MissingInput { .. }));
}

#[test]
fn test_latest_version_without_stable_declaration() {
    let temp_dir = TempDir::new().unwrap();
    for dir in ["v9", "v10", "docs"] {
        fs::create_dir_all(temp_dir.path().join("farmbot-bare").join(dir)).unwrap();
    }

    let discovery = FileDiscovery::new(temp_dir.path(), "farmbot-");
    let stable = StableVersions::default();
    let checker = TocChecker::new(&discovery, &stable, TocOptions::default());

    assert_eq!(
        checker.latest_version_dir("bare").unwrap().as_deref(),
        Some("v10")
    );
}
