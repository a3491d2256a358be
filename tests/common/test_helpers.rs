use std::fs;
use std::path::{Path, PathBuf};

use docs_check::cli::Check;
use docs_check::config::Config;
use docs_check::emoji::EmojiCatalog;
use docs_check::file_discovery::FileDiscovery;
use docs_check::versions::StableVersions;
use tempfile::TempDir;

/// Hub of the fixture corpus.
pub const HUB: &str = "test";

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    /// Corpus root holding `farmbot-test`.
    pub fn root(&self) -> &Path {
        &self.fixtures_dir
    }

    pub fn hub_dir(&self) -> PathBuf {
        self.fixtures_dir.join("farmbot-test")
    }

    pub fn stable_versions_file(&self) -> PathBuf {
        self.fixtures_dir.join("STABLE_VERSIONS.json")
    }

    pub fn emoji_names_file(&self) -> PathBuf {
        self.fixtures_dir.join("valid_emoji_names.json")
    }

    pub fn discovery(&self) -> FileDiscovery {
        FileDiscovery::new(self.fixtures_dir.clone(), "farmbot-")
    }

    pub fn stable_versions(&self) -> StableVersions {
        StableVersions::load(&self.stable_versions_file()).unwrap()
    }

    pub fn emoji_catalog(&self) -> EmojiCatalog {
        EmojiCatalog::load(&self.emoji_names_file()).unwrap()
    }

    /// Configuration for the fixture corpus writing results into `results_dir`.
    pub fn config(&self, results_dir: &Path, checks: &[Check]) -> Config {
        let mut config = Config::default();
        config.checks.enabled = checks.to_vec();
        config.paths.results_dir = results_dir.to_path_buf();
        config
    }
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}

pub fn hubs() -> Vec<String> {
    vec![HUB.to_string()]
}

/// Writable copy of the fixture corpus.
pub fn copy_corpus(fixtures: &TestFixtures) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    copy_dir(fixtures.root(), temp_dir.path());
    temp_dir
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}
