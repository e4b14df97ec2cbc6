use ignore::gitignore::{Gitignore, GitignoreBuilder};
use imgdiff_common::{AppConfig, Directory, ImgDiffError};
use jwalk::{Parallelism, WalkDir};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Builds filesystem snapshots from extracted image trees
pub struct SnapshotBuilder {
    config: AppConfig,
    custom_ignore: Option<Gitignore>,
}

impl SnapshotBuilder {
    pub fn new(config: AppConfig) -> Self {
        let custom_ignore = Self::build_custom_ignore(&config);
        Self {
            config,
            custom_ignore,
        }
    }

    /// Build a Gitignore from custom ignore patterns in config
    fn build_custom_ignore(config: &AppConfig) -> Option<Gitignore> {
        if config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in &config.ignore_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    /// Snapshot `root` using the listing depth from the configuration
    pub fn snapshot(&self, root: &Path) -> Result<Directory, ImgDiffError> {
        self.directory(root, self.config.deep_listing)
    }

    /// Snapshot `root`. Shallow listings hold direct children only; deep ones every descendant.
    pub fn directory(&self, root: &Path, deep: bool) -> Result<Directory, ImgDiffError> {
        let content = if deep {
            self.deep_listing(root)?
        } else {
            self.shallow_listing(root)?
        };

        debug!("Snapshot of {:?} holds {} entries", root, content.len());
        Ok(Directory::new(root, content))
    }

    fn shallow_listing(&self, root: &Path) -> Result<Vec<PathBuf>, ImgDiffError> {
        let mut content = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name();
            let relative = Path::new(&name);
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if self.should_ignore_with_parents(relative, is_dir) {
                continue;
            }
            content.push(entry_name(relative));
        }
        content.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(content)
    }

    fn deep_listing(&self, root: &Path) -> Result<Vec<PathBuf>, ImgDiffError> {
        // Fail early like the shallow listing does when the root itself is unusable
        if !fs::metadata(root)?.is_dir() {
            return Err(ImgDiffError::Path(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false)
            .sort(true);

        let mut content = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };

            let path = entry.path();
            let relative = path
                .strip_prefix(root)
                .map_err(|e| ImgDiffError::Path(e.to_string()))?;

            // Skip the synthetic root entry (empty path)
            if relative.as_os_str().is_empty() {
                continue;
            }

            if self.should_ignore_with_parents(relative, entry.file_type().is_dir()) {
                continue;
            }

            content.push(entry_name(relative));
        }
        Ok(content)
    }

    /// Check if a path or any of its parent directories should be ignored
    fn should_ignore_with_parents(&self, path: &Path, is_dir: bool) -> bool {
        if let Some(ref custom_ignore) = self.custom_ignore {
            if custom_ignore.matched(path, is_dir).is_ignore() {
                return true;
            }

            let mut current = path;
            while let Some(parent) = current.parent() {
                if !parent.as_os_str().is_empty()
                    && custom_ignore.matched(parent, true).is_ignore()
                {
                    return true;
                }
                current = parent;
            }
        }
        false
    }
}

/// Turn a root-relative path into a snapshot entry: `/` separated with a leading `/`.
/// Name bytes are kept as they are.
fn entry_name(relative: &Path) -> PathBuf {
    let mut name = PathBuf::from("/");
    for component in relative.components() {
        if let Component::Normal(part) = component {
            name.push(part);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file1.txt"), b"test").unwrap();
        fs::create_dir_all(temp.path().join("etc/apt")).unwrap();
        fs::write(temp.path().join("etc/apt/sources.list"), b"deb").unwrap();
        fs::write(temp.path().join(".hidden"), b"h").unwrap();
        temp
    }

    fn entries(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_shallow_listing_direct_children() {
        let temp = sample_tree();
        let builder = SnapshotBuilder::new(AppConfig::default());
        let dir = builder.directory(temp.path(), false).unwrap();

        assert_eq!(dir.root, temp.path());
        assert_eq!(dir.content, entries(&["/.hidden", "/etc", "/file1.txt"]));
    }

    #[test]
    fn test_deep_listing_every_descendant() {
        let temp = sample_tree();
        let builder = SnapshotBuilder::new(AppConfig::default());
        let dir = builder.directory(temp.path(), true).unwrap();

        assert_eq!(
            dir.content,
            entries(&["/.hidden", "/etc", "/etc/apt", "/etc/apt/sources.list", "/file1.txt"])
        );
        for entry in &dir.content {
            assert!(dir.resolve(entry).exists(), "{:?} should resolve", entry);
        }
    }

    #[test]
    fn test_deep_listing_excludes_root() {
        let temp = TempDir::new().unwrap();
        let builder = SnapshotBuilder::new(AppConfig::default());
        let dir = builder.directory(temp.path(), true).unwrap();
        assert!(dir.content.is_empty());
    }

    #[test]
    fn test_snapshot_uses_configured_depth() {
        let temp = sample_tree();
        let mut config = AppConfig::default();
        config.deep_listing = false;
        let dir = SnapshotBuilder::new(config).snapshot(temp.path()).unwrap();
        assert_eq!(dir.content.len(), 3);
    }

    #[test]
    fn test_ignore_patterns_drop_descendants() {
        let temp = sample_tree();
        fs::create_dir_all(temp.path().join("proc/1")).unwrap();
        fs::write(temp.path().join("proc/1/status"), b"running").unwrap();
        fs::write(temp.path().join("cache.pyc"), b"x").unwrap();

        let mut config = AppConfig::default();
        config.ignore_patterns = vec!["proc/".to_string(), "*.pyc".to_string()];
        let dir = SnapshotBuilder::new(config).directory(temp.path(), true).unwrap();

        assert!(dir.content.iter().all(|e| !e.starts_with("/proc")));
        assert!(!dir.content.contains(&PathBuf::from("/cache.pyc")));
        assert!(dir.content.contains(&PathBuf::from("/etc/apt/sources.list")));
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent");
        let builder = SnapshotBuilder::new(AppConfig::default());

        assert!(builder.directory(&missing, false).is_err());
        assert!(builder.directory(&missing, true).is_err());
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name(Path::new("usr/bin/env")), PathBuf::from("/usr/bin/env"));
        assert_eq!(entry_name(Path::new("a")), PathBuf::from("/a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_stay_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"bad\xff")), b"one").unwrap();
        fs::write(temp.path().join(OsStr::from_bytes(b"bad\xfe")), b"two").unwrap();
        let builder = SnapshotBuilder::new(AppConfig::default());

        for deep in [false, true] {
            let dir = builder.directory(temp.path(), deep).unwrap();
            assert_eq!(
                dir.content,
                vec![
                    Path::new("/").join(OsStr::from_bytes(b"bad\xfe")),
                    Path::new("/").join(OsStr::from_bytes(b"bad\xff")),
                ]
            );
            for entry in &dir.content {
                assert!(dir.resolve(entry).exists(), "{:?} should resolve", entry);
            }
        }
    }
}
