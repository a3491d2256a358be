//! Header-slug index used to validate in-page anchors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::file_discovery::MarkdownPage;

/// Generate an anchor slug from header text.
///
/// Trims, lowercases, turns spaces into hyphens and drops ASCII punctuation
/// other than hyphens.
pub fn slugify(header_text: &str) -> String {
    header_text
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| !c.is_ascii_punctuation() || *c == '-')
        .collect()
}

/// Header text of a level 1-3 markdown heading line.
pub fn header_text(line: &str) -> Option<&str> {
    ["# ", "## ", "### "]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
}

/// Canonical form of a path used as an index key.
///
/// Falls back to the path as given when it does not exist on disk.
pub fn canonical_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Mapping from canonical file path to the ordered header slugs of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionIndex {
    sections: HashMap<PathBuf, Vec<String>>,
}

impl SectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index over a set of pages.
    pub fn build<'a>(pages: impl IntoIterator<Item = &'a MarkdownPage>) -> Self {
        let mut index = Self::new();
        for page in pages {
            index.add_page(&page.path, &page.lines);
        }
        index
    }

    /// Index the headers of one file, replacing any earlier entry for it.
    pub fn add_page(&mut self, path: &Path, lines: &[String]) {
        let key = canonical_key(path);
        let slugs: Vec<String> = lines
            .iter()
            .filter_map(|line| header_text(line))
            .map(slugify)
            .collect();
        if slugs.is_empty() {
            self.sections.remove(&key);
        } else {
            self.sections.insert(key, slugs);
        }
    }

    /// Slugs of a file, empty if the file has no headers or is unknown.
    pub fn sections_for(&self, path: &Path) -> &[String] {
        self.sections
            .get(&canonical_key(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `slug` is an anchor of the file at `path`.
    pub fn contains(&self, path: &Path, slug: &str) -> bool {
        self.sections_for(path).iter().any(|s| s == slug)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
