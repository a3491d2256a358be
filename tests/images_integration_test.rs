mod common;

use std::collections::BTreeSet;
use std::fs;

use common::test_helpers::{HUB, TestFixtures, copy_corpus, hubs};
use docs_check::error::CheckError;
use docs_check::file_discovery::FileDiscovery;
use docs_check::images::{ImageChecker, ImageOptions, ImageReport};
use docs_check::links::LinkChecker;
use docs_check::summary::HubResults;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn check_images(discovery: &FileDiscovery, options: ImageOptions) -> ImageReport {
    let stable = TestFixtures::new().stable_versions();
    let links = LinkChecker::new(discovery, &stable, "farm.bot")
        .check_hub(HUB)
        .unwrap();
    ImageChecker::new(discovery, options)
        .check_hub(HUB, &links)
        .unwrap()
}

#[test]
fn test_fixture_hub_usage() {
    let fixtures = TestFixtures::new();
    let report = check_images(&fixtures.discovery(), ImageOptions::default());

    assert_eq!(report.usage.unused, set(&["v2/_images/unused.png"]));
    assert_eq!(
        report.usage.missing,
        set(&["v1/docs/broken image (odd).JPG", "v1/docs/doc:page"])
    );
    assert_eq!(report.declared.paths, set(&["v2/_images/hover.png"]));
    assert!(report.declared.broken.is_empty());
    assert!(!report.has_failures());
    assert_eq!(report.references.get("v1/_images/pic.png"), Some(&1));
}

#[test]
fn test_fixture_hub_stats() {
    let fixtures = TestFixtures::new();
    let report = check_images(&fixtures.discovery(), ImageOptions::default());

    let stats = &report.stats;
    assert_eq!(stats.versions, 2);
    assert_eq!(stats.markdown_files, 2);
    assert_eq!(stats.images.len(), 3);

    let largest = stats.largest_by_pixels(1);
    assert_eq!(largest[0].path, "v2/_images/unused.png");
    assert_eq!(largest[0].dimensions, Some((1920, 1080)));
    assert_eq!(stats.count_above(1.0), 0);
}

#[test]
fn test_summary_text_lists_problem_images() {
    let fixtures = TestFixtures::new();
    let options = ImageOptions {
        top_count: 2,
        extras: true,
    };
    let report = check_images(&fixtures.discovery(), options.clone());
    let text = report.summary_text(&options);

    assert!(text.contains(" IMAGE FILE SUMMARY "));
    assert!(text.contains("Most referenced images"));
    assert!(text.contains("Unused images"));
    assert!(text.contains("  v2/_images/unused.png\n"));
    assert!(text.contains("  v1/docs/broken image (odd).JPG\n"));
    assert!(!text.contains("Broken hover and part image paths"));
}

#[test]
fn test_broken_hover_image_fails() {
    let fixtures = TestFixtures::new();
    let corpus = copy_corpus(&fixtures);
    fs::write(
        corpus
            .path()
            .join("farmbot-test/_data/hover_images/v2.yml"),
        "version_number: 2\ndata:\n  - page: v2_docs\n    data:\n      - image: _images/gone.png\n",
    )
    .unwrap();

    let discovery = FileDiscovery::new(corpus.path(), "farmbot-");
    let report = check_images(&discovery, ImageOptions::default());

    assert!(report.has_failures());
    assert_eq!(
        report.declared.broken,
        vec!["_data/hover_images/v2.yml: _images/gone.png"]
    );
    assert!(report.usage.unused.contains("v2/_images/hover.png"));
    assert!(
        report
            .summary_text(&ImageOptions::default())
            .contains("Broken hover and part image paths")
    );
}

#[test]
fn test_check_all_requires_link_results() {
    let fixtures = TestFixtures::new();
    let discovery = fixtures.discovery();
    let checker = ImageChecker::new(&discovery, ImageOptions::default());

    let error = checker.check_all(&hubs(), &HubResults::new()).unwrap_err();
    assert!(matches!(
        error,
        CheckError::MissingResults { ref key, ref hub } if key == "links" && hub == HUB
    ));
}
