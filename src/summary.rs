//! Result aggregation and persistence.
//!
//! Checkers return their records grouped by hub; [`Summary`] collects them
//! together with the free-form text blocks and image sets produced per hub,
//! writes the JSON result files and decides the process outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::emoji::EmojiRecord;
use crate::error::{CheckError, Result};
use crate::images::ImageUsage;
use crate::links::LinkRecord;
use crate::toc::TocPageRecord;

/// Ordered records per hub, keyed by hub name.
pub type HubResults<T> = BTreeMap<String, Vec<T>>;

/// A classified item with a derived status.
pub trait CheckedItem: Serialize {
    fn status(&self) -> &str;

    fn is_ok(&self) -> bool {
        self.status() == crate::issues::OK
    }
}

impl CheckedItem for LinkRecord {
    fn status(&self) -> &str {
        &self.status
    }
}

impl CheckedItem for EmojiRecord {
    fn status(&self) -> &str {
        &self.status
    }
}

impl CheckedItem for TocPageRecord {
    fn status(&self) -> &str {
        &self.status
    }
}

/// Ok/broken counts of one hub's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub ok: usize,
    pub broken: usize,
}

impl Counts {
    pub fn of<T: CheckedItem>(items: &[T]) -> Self {
        let ok = items.iter().filter(|item| item.is_ok()).count();
        Self {
            total: items.len(),
            ok,
            broken: items.len() - ok,
        }
    }
}

/// Records of every hub that are not `ok`.
pub fn issues_only<T: CheckedItem + Clone>(results: &HubResults<T>) -> HubResults<T> {
    results
        .iter()
        .map(|(hub, items)| {
            let broken = items.iter().filter(|item| !item.is_ok()).cloned().collect();
            (hub.clone(), broken)
        })
        .collect()
}

/// JSON result files: `<key>_results.json` and `<key>_issues.json`.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    dir: PathBuf,
}

impl ResultsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn results_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_results.json", key))
    }

    pub fn issues_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}_issues.json", key))
    }

    /// Write all records and the issues-only subset.
    pub fn save<T: CheckedItem + Clone>(&self, key: &str, results: &HubResults<T>) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CheckError::write(&self.dir, e))?;
        write_json(&self.results_path(key), results)?;
        write_json(&self.issues_path(key), &issues_only(results))?;
        debug!(key, dir = %self.dir.display(), "results saved");
        Ok(())
    }

    /// Read back previously saved records.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<HubResults<T>> {
        let path = self.results_path(key);
        if !path.exists() {
            return Err(CheckError::MissingInput { path });
        }
        let content = fs::read_to_string(&path).map_err(|e| CheckError::read(&path, e))?;
        serde_json::from_str(&content).map_err(|e| CheckError::json(&path, e))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| CheckError::write(path, e))
}

/// Per-hub extras that are not item records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubExtras {
    /// Free-form report text, in the order it was added
    pub text: String,
    pub images: Option<ImageUsage>,
    /// Reasons this hub fails besides broken records
    pub failures: Vec<String>,
}

/// Accumulated results of one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub links: Option<HubResults<LinkRecord>>,
    pub emoji: Option<HubResults<EmojiRecord>>,
    pub toc: Option<HubResults<TocPageRecord>>,
    pub extras: BTreeMap<String, HubExtras>,
    store: Option<ResultsStore>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist every added result set into `store`.
    pub fn with_store(store: ResultsStore) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub fn store(&self) -> Option<&ResultsStore> {
        self.store.as_ref()
    }

    fn persist<T: CheckedItem + Clone>(&self, key: &str, results: &HubResults<T>) -> Result<()> {
        match &self.store {
            Some(store) => store.save(key, results),
            None => Ok(()),
        }
    }

    pub fn add_links(&mut self, results: HubResults<LinkRecord>) -> Result<()> {
        self.persist("links", &results)?;
        self.links = Some(results);
        Ok(())
    }

    pub fn add_emoji(&mut self, results: HubResults<EmojiRecord>) -> Result<()> {
        self.persist("emoji", &results)?;
        self.emoji = Some(results);
        Ok(())
    }

    pub fn add_toc(&mut self, results: HubResults<TocPageRecord>) -> Result<()> {
        self.persist("toc", &results)?;
        self.toc = Some(results);
        Ok(())
    }

    fn extras_mut(&mut self, hub: &str) -> &mut HubExtras {
        self.extras.entry(hub.to_string()).or_default()
    }

    /// Append a text block to a hub's report.
    pub fn add_extra_summary(&mut self, hub: &str, text: &str) {
        self.extras_mut(hub).text.push_str(text);
    }

    pub fn add_image_usage(&mut self, hub: &str, usage: ImageUsage) {
        self.extras_mut(hub).images = Some(usage);
    }

    /// Mark a hub as failing for a reason that has no record (e.g. broken
    /// redirects).
    pub fn add_failure(&mut self, hub: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(hub, %reason, "check failed");
        self.extras_mut(hub).failures.push(reason);
    }

    /// Hubs mentioned by any result, in name order.
    pub fn hubs(&self) -> BTreeSet<String> {
        let mut hubs: BTreeSet<String> = self.extras.keys().cloned().collect();
        for results in [
            self.links.as_ref().map(|r| r.keys().cloned().collect::<Vec<_>>()),
            self.emoji.as_ref().map(|r| r.keys().cloned().collect()),
            self.toc.as_ref().map(|r| r.keys().cloned().collect()),
        ]
        .into_iter()
        .flatten()
        {
            hubs.extend(results);
        }
        hubs
    }

    /// Whether any record of any checker is not `ok`, or any hub failed.
    pub fn has_issues(&self) -> bool {
        fn any_broken<T: CheckedItem>(results: &Option<HubResults<T>>) -> bool {
            results
                .iter()
                .flat_map(|r| r.values())
                .flatten()
                .any(|item| !item.is_ok())
        }
        any_broken(&self.links)
            || any_broken(&self.emoji)
            || any_broken(&self.toc)
            || self.extras.values().any(|extras| !extras.failures.is_empty())
    }

    /// Process exit code: 1 when issues were found.
    pub fn exit_code(&self) -> i32 {
        if self.has_issues() { 1 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::EmojiIssue;
    use tempfile::TempDir;

    fn emoji(name: &str, status: &str) -> EmojiRecord {
        EmojiRecord {
            status: status.to_string(),
            version: Some(1.0),
            from: "v1/docs/page.md".to_string(),
            line_number: 1,
            emoji: name.to_string(),
            issues: if status == "ok" {
                vec![]
            } else {
                vec![EmojiIssue::NotAvailable]
            },
        }
    }

    #[test]
    fn test_counts() {
        let items = vec![emoji("+1", "ok"), emoji("abc", "not available")];
        assert_eq!(
            Counts::of(&items),
            Counts {
                total: 2,
                ok: 1,
                broken: 1
            }
        );
    }

    #[test]
    fn test_exit_code_follows_records() {
        let mut summary = Summary::new();
        let mut results = HubResults::new();
        results.insert("test".to_string(), vec![emoji("+1", "ok")]);
        summary.add_emoji(results).unwrap();
        assert_eq!(summary.exit_code(), 0);

        let mut results = HubResults::new();
        results.insert("test".to_string(), vec![emoji("abc", "not available")]);
        summary.add_emoji(results).unwrap();
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_failure_without_records() {
        let mut summary = Summary::new();
        summary.add_extra_summary("test", "  broken redirects\n");
        assert_eq!(summary.exit_code(), 0);
        summary.add_failure("test", "broken redirects");
        assert_eq!(summary.exit_code(), 1);
        assert!(summary.hubs().contains("test"));
    }

    #[test]
    fn test_store_writes_results_and_issues() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultsStore::new(temp_dir.path().join("results"));
        let mut summary = Summary::with_store(store.clone());

        let mut results = HubResults::new();
        results.insert(
            "test".to_string(),
            vec![emoji("+1", "ok"), emoji("abc", "not available")],
        );
        summary.add_emoji(results).unwrap();

        let all: HubResults<EmojiRecord> = store.load("emoji").unwrap();
        assert_eq!(all["test"].len(), 2);

        let issues: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.issues_path("emoji")).unwrap())
                .unwrap();
        assert_eq!(issues["test"].as_array().unwrap().len(), 1);
        assert_eq!(issues["test"][0]["emoji"], "abc");
        assert_eq!(issues["test"][0]["issues"][0], "not_available");
    }

    #[test]
    fn test_unwritable_store_reports_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("results");
        fs::write(&blocker, "not a directory").unwrap();
        let mut summary = Summary::with_store(ResultsStore::new(&blocker));

        let error = summary.add_emoji(HubResults::new()).unwrap_err();
        assert!(matches!(error, CheckError::WriteFile { ref path, .. } if path == &blocker));
    }

    #[test]
    fn test_load_missing_results() {
        let store = ResultsStore::new("/nonexistent/results");
        let result: Result<HubResults<LinkRecord>> = store.load("links");
        assert!(matches!(result, Err(CheckError::MissingInput { .. })));
    }
}
