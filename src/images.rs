//! Image asset reconciliation and statistics.
//!
//! An image is used when a link points at it, when hover or part data
//! declares it, or when a spec-sheet page's gallery picks it up. Anything
//! else on disk is unused; any linked image not on disk is missing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CheckError, Result};
use crate::file_discovery::{FileDiscovery, is_markdown, join_target, read_lines, to_slash};
use crate::links::{LinkRecord, LinkRelation};
use crate::output::banner;
use crate::summary::HubResults;
use crate::versions::VersionValue;

/// Hover image data, relative to the hub directory.
pub const HOVER_IMAGES_DIR: &str = "_data/hover_images";

/// Part image data, relative to the hub directory.
pub const PART_IMAGES_DIR: &str = "_data/parts";

/// Gallery images of a spec-sheet page live in this sibling directory.
pub const GALLERY_DIR: &str = "_images";

const FRONT_MATTER_FENCE: &str = "---";

/// Leading bytes read from an image to find its dimensions. Covers JPEG
/// metadata segments that precede the frame header.
const HEADER_BYTES: u64 = 256 * 1024;
const SIZE_THRESHOLDS_MB: [f64; 4] = [4.0, 2.0, 1.0, 0.5];
const POTENTIAL_AVERAGES_MB: [f64; 2] = [0.25, 0.5];

/// `{version_number, data: [{page, data: [{section?, image}]}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct HoverDocument {
    pub version_number: VersionValue,
    #[serde(default)]
    pub data: Vec<HoverPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoverPage {
    pub page: String,
    #[serde(default)]
    pub data: Vec<HoverImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HoverImage {
    #[serde(default)]
    pub section: Option<String>,
    pub image: String,
}

/// `{version_number, bom: [{category, parts: [{image, ...}]}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct PartDocument {
    pub version_number: VersionValue,
    #[serde(default)]
    pub bom: Vec<PartCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartCategory {
    pub category: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub image: Option<String>,
}

/// Unused and missing images of a hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUsage {
    pub unused: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

impl ImageUsage {
    pub fn is_clean(&self) -> bool {
        self.unused.is_empty() && self.missing.is_empty()
    }
}

/// `unused = on_disk − linked − declared − gallery`, `missing = linked − on_disk`.
pub fn reconcile(
    on_disk: &BTreeSet<String>,
    linked: &BTreeSet<String>,
    declared: &BTreeSet<String>,
    gallery: &BTreeSet<String>,
) -> ImageUsage {
    let unused = on_disk
        .iter()
        .filter(|path| !linked.contains(*path) && !declared.contains(*path) && !gallery.contains(*path))
        .cloned()
        .collect();
    let missing = linked.difference(on_disk).cloned().collect();
    ImageUsage { unused, missing }
}

/// Image paths declared in hover or part data, with the ones that do not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredImages {
    /// Hub-relative paths of every declared image
    pub paths: BTreeSet<String>,
    /// `<data file>: <image>` for each declared image that does not exist
    pub broken: Vec<String>,
}

impl DeclaredImages {
    fn add(&mut self, hub_dir: &Path, data_file: &str, version_dir: &str, image: &str) {
        let path = to_slash(&join_target(Path::new(version_dir), image));
        if !hub_dir.join(&path).is_file() {
            self.broken.push(format!("{}: {}", data_file, image));
        }
        self.paths.insert(path);
    }

    fn extend(&mut self, other: DeclaredImages) {
        self.paths.extend(other.paths);
        self.broken.extend(other.broken);
    }
}

/// Width and height from a PNG, GIF or JPEG header.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() >= 24 && data.starts_with(&[0x89, b'P', b'N', b'G']) {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height));
    }
    if data.len() >= 10 && data.starts_with(b"GIF") {
        let width = u16::from_le_bytes([data[6], data[7]]) as u32;
        let height = u16::from_le_bytes([data[8], data[9]]) as u32;
        return Some((width, height));
    }
    if data.starts_with(&[0xFF, 0xD8]) {
        return jpeg_dimensions(data);
    }
    None
}

/// Leading bytes of a file, enough for `image_dimensions`.
pub fn read_header(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| CheckError::read(path, e))?;
    let mut header = Vec::new();
    file.take(HEADER_BYTES)
        .read_to_end(&mut header)
        .map_err(|e| CheckError::read(path, e))?;
    Ok(header)
}

/// Walk JPEG segments up to the first start-of-frame marker.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        let is_start_of_frame =
            matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_start_of_frame && i + 9 < data.len() {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

/// A non-markdown file inside a version directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    /// Hub-relative path
    pub path: String,
    pub size_mb: f64,
    pub dimensions: Option<(u32, u32)>,
}

impl ImageFile {
    pub fn megapixels(&self) -> f64 {
        self.dimensions
            .map(|(w, h)| w as f64 * h as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }
}

/// Size and pixel statistics of a hub's images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageStats {
    pub versions: usize,
    pub markdown_files: usize,
    pub images: Vec<ImageFile>,
}

impl ImageStats {
    pub fn count_above(&self, megabytes: f64) -> usize {
        self.images.iter().filter(|img| img.size_mb > megabytes).count()
    }

    pub fn total_size(&self) -> f64 {
        self.images.iter().map(|img| img.size_mb).sum()
    }

    pub fn average_size(&self) -> f64 {
        self.total_size() / self.images.len().max(1) as f64
    }

    pub fn largest_by_size(&self, count: usize) -> Vec<&ImageFile> {
        let mut sorted: Vec<&ImageFile> = self.images.iter().collect();
        sorted.sort_by(|a, b| b.size_mb.total_cmp(&a.size_mb).then_with(|| b.path.cmp(&a.path)));
        sorted.truncate(count);
        sorted
    }

    pub fn largest_by_pixels(&self, count: usize) -> Vec<&ImageFile> {
        let mut sorted: Vec<&ImageFile> = self.images.iter().collect();
        sorted.sort_by(|a, b| {
            b.megapixels()
                .total_cmp(&a.megapixels())
                .then_with(|| b.path.cmp(&a.path))
        });
        sorted.truncate(count);
        sorted
    }
}

/// Everything found for one hub.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageReport {
    pub stats: ImageStats,
    pub usage: ImageUsage,
    pub declared: DeclaredImages,
    /// How often each linked image is referenced
    pub references: BTreeMap<String, usize>,
}

impl ImageReport {
    /// Broken hover or part image paths fail the run.
    pub fn has_failures(&self) -> bool {
        !self.declared.broken.is_empty()
    }

    /// Report text for the hub summary.
    pub fn summary_text(&self, options: &ImageOptions) -> String {
        let mut text = ReportText::default();
        text.raw(&banner("image file summary"));

        let stats = &self.stats;
        text.title("Statistics");
        text.line(&format!("{:10}    versions", stats.versions));
        text.line(&format!("{:10}    markdown files", stats.markdown_files));
        text.line(&format!("{:10}    images", stats.images.len()));
        for megabytes in SIZE_THRESHOLDS_MB {
            text.line(&format!(
                "{:10}    images > {} MB",
                stats.count_above(megabytes),
                megabytes
            ));
        }
        text.line(&format!("{:10.2} MB total size", stats.total_size()));
        text.line(&format!("{:10.2} MB average size", stats.average_size()));

        if options.extras {
            text.title("Potential sizes");
            let count = stats.images.len() as f64;
            for megabytes in POTENTIAL_AVERAGES_MB {
                let total = count * megabytes;
                let surplus = count * (stats.average_size() - megabytes);
                text.line(&format!(
                    "{:10.2} MB avg: {:.2} MB total ({:.2} MB less)",
                    megabytes, total, surplus
                ));
            }

            text.title("Most referenced images");
            let mut counts: Vec<(&String, &usize)> = self.references.iter().collect();
            counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (path, count) in counts.into_iter().take(options.top_count) {
                text.line(&format!("{} {}", count, path));
            }
        }

        text.title("Largest images by file size");
        for image in stats.largest_by_size(options.top_count) {
            text.line(&format!("{:6.2} MB {}", image.size_mb, image.path));
        }

        text.title("Largest images by pixel count");
        for image in stats.largest_by_pixels(options.top_count) {
            let (width, height) = image.dimensions.unwrap_or((0, 0));
            text.line(&format!(
                "{:6.2} MP {:5} x {:5} {}",
                image.megapixels(),
                width,
                height,
                image.path
            ));
        }

        let broken = &self.declared.broken;
        if !self.usage.is_clean() || !broken.is_empty() {
            text.line("");
            text.raw(&banner("problem images"));
            if !self.usage.is_clean() {
                text.title("Unused images");
                self.usage.unused.iter().for_each(|path| text.line(path));
                text.title("Missing images");
                self.usage.missing.iter().for_each(|path| text.line(path));
            }
            if !broken.is_empty() {
                text.title("Broken hover and part image paths");
                broken.iter().for_each(|path| text.line(path));
            }
        }
        text.0
    }
}

/// Indented report lines.
#[derive(Default)]
struct ReportText(String);

impl ReportText {
    fn raw(&mut self, s: &str) {
        self.0.push_str(s);
        self.0.push('\n');
    }

    fn line(&mut self, s: &str) {
        self.0.push_str("  ");
        self.raw(s);
    }

    fn title(&mut self, s: &str) {
        self.line("");
        self.line(s);
        self.line("----------");
    }
}

/// Options of the image check.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Entries in each "largest" listing
    pub top_count: usize,
    /// Include potential-size and most-referenced listings
    pub extras: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            top_count: 3,
            extras: false,
        }
    }
}

/// Hub-relative paths of linked local images, with reference counts.
pub fn linked_images(hub_title: &str, links: &[LinkRecord]) -> BTreeMap<String, usize> {
    let prefix = format!("{}/", hub_title);
    let mut counts = BTreeMap::new();
    for link in links {
        if link.relation != LinkRelation::Relative {
            continue;
        }
        let Some(target) = &link.to_absolute else {
            continue;
        };
        if target.ends_with(".md") {
            continue;
        }
        let path = target.strip_prefix(&prefix).unwrap_or(target);
        *counts.entry(path.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Slug and spec-sheet flag from a page's front matter.
fn gallery_slug(lines: &[String]) -> Option<String> {
    let mut fences = 0;
    let mut slug = String::new();
    for line in lines {
        if line == FRONT_MATTER_FENCE {
            fences += 1;
        }
        if fences > 1 {
            break;
        }
        if fences == 1 {
            if let Some(raw) = line.strip_prefix("slug:") {
                slug.push_str(raw.trim().trim_matches('"'));
            }
            if line.starts_with("specs:") {
                return Some(slug);
            }
        }
    }
    None
}

/// Checks image usage of every hub against persisted or in-memory links.
pub struct ImageChecker<'a> {
    discovery: &'a FileDiscovery,
    options: ImageOptions,
}

impl<'a> ImageChecker<'a> {
    pub fn new(discovery: &'a FileDiscovery, options: ImageOptions) -> Self {
        Self { discovery, options }
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// Check every hub present on disk. Each hub needs link results.
    pub fn check_all(
        &self,
        hubs: &[String],
        links: &HubResults<LinkRecord>,
    ) -> Result<BTreeMap<String, ImageReport>> {
        let mut reports = BTreeMap::new();
        for hub in hubs {
            if !self.discovery.hub_exists(hub) {
                continue;
            }
            let hub_links = links.get(hub).ok_or_else(|| CheckError::MissingResults {
                key: "links".to_string(),
                hub: hub.clone(),
            })?;
            reports.insert(hub.clone(), self.check_hub(hub, hub_links)?);
        }
        Ok(reports)
    }

    pub fn check_hub(&self, hub: &str, links: &[LinkRecord]) -> Result<ImageReport> {
        info!("checking image files in {}", self.discovery.hub_title(hub));
        let hub_dir = self.discovery.hub_dir(hub);

        let references = linked_images(&self.discovery.hub_title(hub), links);
        let linked: BTreeSet<String> = references.keys().cloned().collect();

        let mut declared = self.hover_images(hub)?;
        declared.extend(self.part_images(hub)?);

        let mut markdown_files = Vec::new();
        let mut images = Vec::new();
        for relative in self.discovery.content_files(hub)? {
            if is_markdown(&relative) {
                markdown_files.push(relative);
                continue;
            }
            let path = hub_dir.join(&relative);
            let size = fs::metadata(&path)
                .map_err(|e| CheckError::read(&path, e))?
                .len();
            images.push(ImageFile {
                path: to_slash(&relative),
                size_mb: size as f64 / 1_000_000.0,
                dimensions: image_dimensions(&read_header(&path)?),
            });
        }

        let mut gallery = BTreeSet::new();
        for relative in &markdown_files {
            gallery.extend(self.gallery_images(&hub_dir, relative)?);
        }

        let on_disk: BTreeSet<String> = images.iter().map(|img| img.path.clone()).collect();
        let usage = reconcile(&on_disk, &linked, &declared.paths, &gallery);
        debug!(
            hub,
            images = on_disk.len(),
            unused = usage.unused.len(),
            missing = usage.missing.len(),
            "images reconciled"
        );

        Ok(ImageReport {
            stats: ImageStats {
                versions: self.discovery.version_dirs(hub)?.len(),
                markdown_files: markdown_files.len(),
                images,
            },
            usage,
            declared,
            references,
        })
    }

    /// Images of the sibling gallery directory matching a spec-sheet page's slug.
    fn gallery_images(&self, hub_dir: &Path, relative: &Path) -> Result<Vec<String>> {
        let lines = read_lines(&hub_dir.join(relative))?;
        let Some(slug) = gallery_slug(&lines) else {
            return Ok(Vec::new());
        };
        let gallery_dir = relative.parent().unwrap_or(Path::new("")).join(GALLERY_DIR);
        let absolute = hub_dir.join(&gallery_dir);
        let entries = match fs::read_dir(&absolute) {
            Ok(entries) => entries,
            Err(_) => {
                warn!(page = %to_slash(relative), "spec page without a gallery directory");
                return Ok(Vec::new());
            }
        };
        let mut used = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().to_string();
            if name.replace('_', "-").contains(&slug) {
                used.push(to_slash(&gallery_dir.join(&name)));
            }
        }
        used.sort();
        Ok(used)
    }

    fn data_documents<T: serde::de::DeserializeOwned>(
        &self,
        hub: &str,
        dir: &str,
    ) -> Result<Vec<(String, T)>> {
        let data_dir = self.discovery.hub_dir(hub).join(dir);
        if !data_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<_> = fs::read_dir(&data_dir)
            .map_err(|e| CheckError::read(&data_dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut documents = Vec::new();
        for path in files {
            let content = fs::read_to_string(&path).map_err(|e| CheckError::read(&path, e))?;
            let document = serde_yaml::from_str(&content).map_err(|e| CheckError::yaml(&path, e))?;
            let name = format!(
                "{}/{}",
                dir,
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );
            documents.push((name, document));
        }
        Ok(documents)
    }

    /// Verify every image path of the hub's hover data.
    pub fn hover_images(&self, hub: &str) -> Result<DeclaredImages> {
        let hub_dir = self.discovery.hub_dir(hub);
        let mut declared = DeclaredImages::default();
        for (name, document) in self.data_documents::<HoverDocument>(hub, HOVER_IMAGES_DIR)? {
            let version_dir = self
                .discovery
                .version_dir_name(hub, &document.version_number.normalized())?;
            for image in document.data.iter().flat_map(|page| &page.data) {
                declared.add(&hub_dir, &name, &version_dir, &image.image);
            }
        }
        Ok(declared)
    }

    /// Verify every image path of the hub's part data.
    pub fn part_images(&self, hub: &str) -> Result<DeclaredImages> {
        let hub_dir = self.discovery.hub_dir(hub);
        let mut declared = DeclaredImages::default();
        for (name, document) in self.data_documents::<PartDocument>(hub, PART_IMAGES_DIR)? {
            let version_dir = self
                .discovery
                .version_dir_name(hub, &document.version_number.normalized())?;
            for image in document
                .bom
                .iter()
                .flat_map(|category| &category.parts)
                .filter_map(|part| part.image.as_deref())
            {
                declared.add(&hub_dir, &name, &version_dir, image);
            }
        }
        Ok(declared)
    }
}
