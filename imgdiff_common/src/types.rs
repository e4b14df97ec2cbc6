use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Size reported for an entry whose size could not be resolved
pub const SIZE_UNKNOWN: i64 = -1;

/// An image under inspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Identifier used to label results (registry reference, tarball path, ...)
    pub source: String,
    /// Root of the image's extracted filesystem
    pub fs_path: PathBuf,
}

impl Image {
    pub fn new(source: impl Into<String>, fs_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            fs_path: fs_path.into(),
        }
    }
}

/// Metadata for one installed package version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub version: String,
    pub size: i64,
}

impl PackageInfo {
    pub fn new(version: impl Into<String>, size: i64) -> Self {
        Self {
            version: version.into(),
            size,
        }
    }
}

/// Package name to its single installed version
pub type SingleVersionInventory = BTreeMap<String, PackageInfo>;

/// Package name to every installed version of it, keyed by version string
pub type MultiVersionInventory = BTreeMap<String, BTreeMap<String, PackageInfo>>;

/// Before/after metadata for a package present in both images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageChange {
    pub before: PackageInfo,
    pub after: PackageInfo,
}

/// Delta between two single-version inventories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVersionPackageDiff {
    pub added: SingleVersionInventory,
    pub removed: SingleVersionInventory,
    pub modified: BTreeMap<String, PackageChange>,
}

impl SingleVersionPackageDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Versions of one package that appeared or disappeared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDelta {
    pub added: BTreeMap<String, PackageInfo>,
    pub removed: BTreeMap<String, PackageInfo>,
}

impl VersionDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Delta between two multi-version inventories, grouped by package name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiVersionPackageDiff {
    pub packages: BTreeMap<String, VersionDelta>,
}

impl MultiVersionPackageDiff {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVersionPackageDiffResult {
    pub image1: String,
    pub image2: String,
    pub diff_type: String,
    pub diff: SingleVersionPackageDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiVersionPackageDiffResult {
    pub image1: String,
    pub image2: String,
    pub diff_type: String,
    pub diff: MultiVersionPackageDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleVersionPackageAnalyzeResult {
    pub image: String,
    pub analyze_type: String,
    pub analysis: SingleVersionInventory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiVersionPackageAnalyzeResult {
    pub image: String,
    pub analyze_type: String,
    pub analysis: MultiVersionInventory,
}

/// A filesystem snapshot: a root plus the entry paths found beneath it.
///
/// Entry paths carry a leading `/` and are resolved against `root`. They are kept as
/// `PathBuf` so names that are not valid UTF-8 stay distinct and resolvable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub root: PathBuf,
    pub content: Vec<PathBuf>,
}

impl Directory {
    pub fn new<I, P>(root: impl Into<PathBuf>, content: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            content: content.into_iter().map(Into::into).collect(),
        }
    }

    /// Location of `entry` on disk
    pub fn resolve(&self, entry: impl AsRef<Path>) -> PathBuf {
        resolve_entry(&self.root, entry.as_ref())
    }
}

/// Join a snapshot entry onto a root without letting the leading `/` replace the root
pub fn resolve_entry(root: &Path, entry: &Path) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for component in entry.components() {
        if let Component::Normal(part) = component {
            resolved.push(part);
        }
    }
    resolved
}

/// Report form of a snapshot entry
pub fn entry_display_name(entry: &Path) -> String {
    entry.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub size: i64,
}

/// A path present in both snapshots whose content differs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDiff {
    pub name: String,
    pub size1: i64,
    pub size2: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirDiff {
    pub adds: Vec<DirectoryEntry>,
    pub dels: Vec<DirectoryEntry>,
    pub mods: Vec<EntryDiff>,
}

impl DirDiff {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.dels.is_empty() && self.mods.is_empty()
    }
}

/// Filesystem diff between two images
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirDiffResult {
    pub image1: String,
    pub image2: String,
    pub diff_type: String,
    pub diff: DirDiff,
}

/// Listing of one image's filesystem with resolved sizes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalyzeResult {
    pub image: String,
    pub analyze_type: String,
    pub analysis: Vec<DirectoryEntry>,
}

/// How matched archive entries are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveComparison {
    /// Same size means same archive. Content changes that keep the size go unnoticed.
    #[default]
    SizeOnly,
    /// Archives are compared byte for byte like any other file
    Content,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ignore patterns applied when building snapshots (e.g., "*.pyc", "proc/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether to follow symbolic links during deep listings
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Walk every descendant instead of listing direct children only
    #[serde(default = "default_deep_listing")]
    pub deep_listing: bool,

    #[serde(default)]
    pub archive_comparison: ArchiveComparison,

    /// Filename suffixes treated as archives by the equality policy
    #[serde(default = "default_archive_suffixes")]
    pub archive_suffixes: Vec<String>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            deep_listing: default_deep_listing(),
            archive_comparison: ArchiveComparison::default(),
            archive_suffixes: default_archive_suffixes(),
            portable_mode: false,
        }
    }
}

fn default_deep_listing() -> bool {
    true
}

pub fn default_archive_suffixes() -> Vec<String> {
    vec![".tar".to_string(), ".tar.gz".to_string(), ".tgz".to_string()]
}
