//! Version directory naming and the stable-version lookup table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{CheckError, Result};

/// Directory name used for unversioned content.
pub const UNVERSIONED: &str = "docs";

/// Check if the provided name is a numbered version directory name
/// (`v15`, `v1.5`, `15`).
pub fn is_version_name(name: &str) -> bool {
    let trimmed = name.trim_matches('v');
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// Check if a directory name holds versioned or unversioned content.
pub fn is_content_dir_name(name: &str) -> bool {
    is_version_name(name) || name == UNVERSIONED
}

/// Canonical form of a version identifier, used for comparisons.
///
/// `v15`, `15` and `15.0` all normalize to `15`; non-numeric names are kept.
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim().trim_matches('v');
    match trimmed.parse::<f64>() {
        Ok(number) => format!("{}", number),
        Err(_) => version.trim().to_string(),
    }
}

/// Numeric value of a version directory name, if it has one.
pub fn version_number(version: &str) -> Option<f64> {
    if is_version_name(version) {
        version.trim_matches('v').parse().ok()
    } else {
        None
    }
}

/// Version directory a hub-relative path lives in (its first component).
pub fn version_of(hub_relative: &Path) -> Option<String> {
    let first = hub_relative.components().next()?;
    let name = first.as_os_str().to_str()?;
    is_content_dir_name(name).then(|| name.to_string())
}

/// A version as written in data files: `15`, `1.5`, `"v15"` or `docs`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VersionValue {
    Number(f64),
    Text(String),
}

impl VersionValue {
    pub fn normalized(&self) -> String {
        match self {
            VersionValue::Number(n) => format!("{}", n),
            VersionValue::Text(s) => normalize(s),
        }
    }
}

/// Stable versions per hub, as declared in `STABLE_VERSIONS.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StableVersions {
    hubs: BTreeMap<String, BTreeSet<String>>,
}

impl StableVersions {
    /// Load the lookup table. A missing or malformed file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CheckError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::read(path, e))?;
        Self::from_json(&content).map_err(|e| CheckError::json(path, e))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, Vec<VersionValue>> = serde_json::from_str(content)?;
        let hubs = raw
            .into_iter()
            .map(|(hub, versions)| (hub, versions.iter().map(VersionValue::normalized).collect()))
            .collect();
        Ok(Self { hubs })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        let hubs = pairs
            .into_iter()
            .map(|(hub, versions)| {
                (
                    hub.to_string(),
                    versions.iter().map(|v| normalize(v)).collect(),
                )
            })
            .collect();
        Self { hubs }
    }

    /// Hubs listed in the table, in name order.
    pub fn hubs(&self) -> impl Iterator<Item = &str> {
        self.hubs.keys().map(String::as_str)
    }

    /// Stable set declared for a hub, if any.
    pub fn for_hub(&self, hub: &str) -> Option<&BTreeSet<String>> {
        self.hubs.get(hub)
    }

    /// `None` when the hub declares no stable set.
    pub fn is_stable(&self, hub: &str, version: &str) -> Option<bool> {
        self.for_hub(hub).map(|set| set.contains(&normalize(version)))
    }

    /// Highest numbered stable version of a hub, normalized.
    pub fn latest(&self, hub: &str) -> Option<String> {
        self.for_hub(hub)?
            .iter()
            .filter_map(|v| v.parse::<f64>().ok().map(|n| (n, v)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, v)| v.clone())
    }
}
