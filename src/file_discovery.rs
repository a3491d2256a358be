use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{CheckError, Result};
use crate::versions;

/// A markdown file inside a hub's version directory.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownPage {
    /// Hub key (`software`, `genesis`, ...)
    pub hub: String,
    /// Version directory the page lives in (`v15`, `docs`)
    pub version: String,
    /// Path relative to the hub directory, e.g. `v15/docs/intro.md`
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Raw lines without line terminators
    pub lines: Vec<String>,
}

impl MarkdownPage {
    /// Directory containing the page on disk.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// File name of the page.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Hub-relative path rendered with forward slashes.
    pub fn display_path(&self) -> String {
        to_slash(&self.relative_path)
    }
}

/// Join a link target onto `base`.
///
/// Leading slashes are dropped so that `/page.md` stays under `base`.
pub fn join_target(base: &Path, target: &str) -> PathBuf {
    base.join(target.trim_start_matches('/'))
}

/// Render a relative path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Discovery of hubs, version directories and their files inside a
/// documentation corpus root.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Folder containing the `<prefix><hub>` directories
    root: PathBuf,
    /// Hub directory prefix (e.g. `farmbot-`)
    hub_prefix: String,
}

impl FileDiscovery {
    /// Create a new FileDiscovery instance
    pub fn new(root: impl Into<PathBuf>, hub_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            hub_prefix: hub_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name for a hub (`farmbot-software`)
    pub fn hub_title(&self, hub: &str) -> String {
        format!("{}{}", self.hub_prefix, hub)
    }

    pub fn hub_dir(&self, hub: &str) -> PathBuf {
        self.root.join(self.hub_title(hub))
    }

    pub fn hub_exists(&self, hub: &str) -> bool {
        self.hub_dir(hub).is_dir()
    }

    /// Hubs present on disk, in name order.
    pub fn discover_hubs(&self) -> Result<Vec<String>> {
        let mut hubs = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| CheckError::read(&self.root, e))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(hub) = name.strip_prefix(&self.hub_prefix)
                && !hub.is_empty()
            {
                hubs.push(hub.to_string());
            }
        }
        hubs.sort();
        Ok(hubs)
    }

    /// Version directories of a hub, in name order.
    pub fn version_dirs(&self, hub: &str) -> Result<Vec<String>> {
        let hub_dir = self.hub_dir(hub);
        let mut versions = Vec::new();
        for entry in fs::read_dir(&hub_dir).map_err(|e| CheckError::read(&hub_dir, e))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type()?.is_dir() && versions::is_content_dir_name(&name) {
                versions.push(name);
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// Find the directory of a (normalized) version identifier.
    pub fn find_version_dir(&self, hub: &str, normalized: &str) -> Result<Option<String>> {
        Ok(self
            .version_dirs(hub)?
            .into_iter()
            .find(|dir| versions::normalize(dir) == normalized))
    }

    /// Directory name for a version declared in a data file: `docs` for
    /// unversioned content, otherwise the matching directory on disk or
    /// `v<version>` when there is none.
    pub fn version_dir_name(&self, hub: &str, normalized: &str) -> Result<String> {
        if normalized == versions::UNVERSIONED {
            return Ok(versions::UNVERSIONED.to_string());
        }
        Ok(self
            .find_version_dir(hub, normalized)?
            .unwrap_or_else(|| format!("v{}", normalized)))
    }

    /// All files inside a hub's content directories, as hub-relative paths.
    ///
    /// Ordered by containing directory, then file name.
    pub fn content_files(&self, hub: &str) -> Result<Vec<PathBuf>> {
        let hub_dir = self.hub_dir(hub);
        let mut files = Vec::new();
        for version in self.version_dirs(hub)? {
            let version_dir = hub_dir.join(&version);
            let walker = WalkBuilder::new(&version_dir)
                .standard_filters(false)
                .follow_links(false)
                .build();
            for entry in walker {
                let entry = entry.map_err(|e| CheckError::FileSystemTraversal {
                    path: version_dir.clone(),
                    reason: e.to_string(),
                })?;
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&hub_dir) {
                    files.push(relative.to_path_buf());
                }
            }
        }
        files.sort_by(|a, b| {
            let dir_a = a.parent().map(to_slash).unwrap_or_default();
            let dir_b = b.parent().map(to_slash).unwrap_or_default();
            dir_a.cmp(&dir_b).then_with(|| a.file_name().cmp(&b.file_name()))
        });
        Ok(files)
    }

    /// Hub-relative paths of every markdown file in a hub.
    pub fn markdown_files(&self, hub: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .content_files(hub)?
            .into_iter()
            .filter(|path| is_markdown(path))
            .collect())
    }

    /// Read every markdown page of a hub.
    pub fn markdown_pages(&self, hub: &str) -> Result<Vec<MarkdownPage>> {
        let hub_dir = self.hub_dir(hub);
        let mut pages = Vec::new();
        for relative_path in self.markdown_files(hub)? {
            let path = hub_dir.join(&relative_path);
            let lines = read_lines(&path)?;
            let version = versions::version_of(&relative_path).unwrap_or_default();
            pages.push(MarkdownPage {
                hub: hub.to_string(),
                version,
                relative_path,
                path,
                lines,
            });
        }
        debug!(hub, pages = pages.len(), "discovered markdown pages");
        Ok(pages)
    }
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("md")
}

/// Read a text file as lines, tolerating invalid UTF-8.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).map_err(|e| CheckError::read(path, e))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}
