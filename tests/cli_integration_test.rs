mod common;

use std::process::{Command, Output};

use common::test_helpers::TestFixtures;
use tempfile::TempDir;

/// Run the binary from an empty directory so no stray config file is found.
fn docs_check(args: &[&str]) -> (Output, TempDir) {
    let work_dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_docs-check"))
        .args(args)
        .current_dir(work_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");
    (output, work_dir)
}

#[test]
fn test_cli_help_output() {
    let (output, _dir) = docs_check(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("documentation hubs"));
    assert!(stdout.contains("--check"));
    assert!(stdout.contains("--hub"));
    assert!(stdout.contains("--results-dir"));
    assert!(stdout.contains("--issue-filter"));
    assert!(stdout.contains("--quiet"));
}

#[test]
fn test_cli_version_output() {
    let (output, _dir) = docs_check(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("docs-check 0.2.0"));
}

#[test]
fn test_cli_invalid_directory_error() {
    let (output, _dir) = docs_check(&["/nonexistent/directory/path"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Path is not a directory"));
}

#[test]
fn test_cli_unknown_issue_filter() {
    let fixtures = TestFixtures::new();
    let root = fixtures.root().to_str().unwrap();
    let (output, _dir) = docs_check(&[root, "--issue-filter", "bogus"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Unknown link issue: bogus"));
}

#[test]
fn test_cli_conflicting_options() {
    let (output, _dir) = docs_check(&[".", "--verbose", "--quiet"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_cli_reports_issues_in_fixture_corpus() {
    let fixtures = TestFixtures::new();
    let results = TempDir::new().unwrap();
    let (output, _dir) = docs_check(&[
        fixtures.root().to_str().unwrap(),
        "--check",
        "links",
        "--check",
        "emoji",
        "--results-dir",
        results.path().to_str().unwrap(),
        "--max-link-issues",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("farmbot-test"));
    assert!(stdout.contains(" BROKEN LINKS "));
    assert!(stdout.contains(" BROKEN EMOJIS "));
    assert!(stdout.contains("not shown"));
    assert!(stdout.trim_end().ends_with("Issues found."));
    assert!(results.path().join("links_issues.json").is_file());
    assert!(results.path().join("emoji_issues.json").is_file());
}

#[test]
fn test_cli_quiet_prints_verdict_only() {
    let fixtures = TestFixtures::new();
    let results = TempDir::new().unwrap();
    let (output, _dir) = docs_check(&[
        fixtures.root().to_str().unwrap(),
        "--quiet",
        "--check",
        "toc",
        "--results-dir",
        results.path().to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Issues found.\n");
}

#[test]
fn test_cli_missing_stable_versions_is_fatal() {
    let fixtures = TestFixtures::new();
    let results = TempDir::new().unwrap();
    let (output, _dir) = docs_check(&[
        fixtures.root().to_str().unwrap(),
        "--stable-versions",
        "NO_SUCH_FILE.json",
        "--results-dir",
        results.path().to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("NO_SUCH_FILE.json"));
}
