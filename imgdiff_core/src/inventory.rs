use crate::package_diff::{MultiVersionAnalyzer, SingleVersionAnalyzer};
use imgdiff_common::{AnalyzerError, Image, MultiVersionInventory, SingleVersionInventory};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Analyzer reading inventories that were already extracted and saved as JSON.
///
/// The inventory is looked up at `image.fs_path`, or at `image.fs_path/<relative>`
/// when a relative location is configured.
#[derive(Debug, Clone)]
pub struct InventoryFileAnalyzer {
    label: String,
    relative: Option<PathBuf>,
}

impl InventoryFileAnalyzer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            relative: None,
        }
    }

    pub fn with_relative_path(mut self, relative: impl Into<PathBuf>) -> Self {
        self.relative = Some(relative.into());
        self
    }

    fn inventory_path(&self, image: &Image) -> PathBuf {
        match &self.relative {
            Some(relative) => image.fs_path.join(relative),
            None => image.fs_path.clone(),
        }
    }

    fn load<T: DeserializeOwned>(&self, image: &Image) -> Result<T, AnalyzerError> {
        let path = self.inventory_path(image);
        debug!("Loading {} inventory for {} from {:?}", self.label, image.source, path);

        let data = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AnalyzerError::NotFound(path.display().to_string()),
            _ => AnalyzerError::Io(e),
        })?;
        serde_json::from_str(&data)
            .map_err(|e| AnalyzerError::Parse(format!("{}: {}", path.display(), e)))
    }
}

impl SingleVersionAnalyzer for InventoryFileAnalyzer {
    fn label(&self) -> &str {
        &self.label
    }

    fn get_packages(&self, image: &Image) -> Result<SingleVersionInventory, AnalyzerError> {
        self.load(image)
    }
}

impl MultiVersionAnalyzer for InventoryFileAnalyzer {
    fn label(&self) -> &str {
        &self.label
    }

    fn get_packages(&self, image: &Image) -> Result<MultiVersionInventory, AnalyzerError> {
        self.load(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_diff::{multi_version_diff, single_version_diff};
    use tempfile::TempDir;

    #[test]
    fn test_single_version_inventory_from_json() {
        let temp = TempDir::new().unwrap();
        let old = temp.path().join("old.json");
        let new = temp.path().join("new.json");
        fs::write(&old, r#"{"curl": {"version": "7.1", "size": 300}}"#).unwrap();
        fs::write(
            &new,
            r#"{"curl": {"version": "7.2", "size": 300}, "wget": {"version": "1.0", "size": 50}}"#,
        )
        .unwrap();

        let analyzer = InventoryFileAnalyzer::new("Apt");
        let result = single_version_diff(
            &Image::new("old", &old),
            &Image::new("new", &new),
            &analyzer,
        )
        .unwrap();

        assert_eq!(result.diff_type, "Apt");
        assert!(result.diff.added.contains_key("wget"));
        assert_eq!(result.diff.modified["curl"].after.version, "7.2");
    }

    #[test]
    fn test_multi_version_inventory_under_relative_path() {
        let temp = TempDir::new().unwrap();
        for (image, versions) in [("one", r#"["1.0", "2.0"]"#), ("two", r#"["2.0", "3.0"]"#)] {
            let dir = temp.path().join(image).join("var/lib/inventory");
            fs::create_dir_all(&dir).unwrap();
            let versions: Vec<String> = serde_json::from_str(versions).unwrap();
            let body = versions
                .iter()
                .map(|v| format!(r#""{v}": {{"version": "{v}", "size": 1}}"#))
                .collect::<Vec<_>>()
                .join(",");
            fs::write(dir.join("node.json"), format!(r#"{{"express": {{{body}}}}}"#)).unwrap();
        }

        let analyzer =
            InventoryFileAnalyzer::new("Node").with_relative_path("var/lib/inventory/node.json");
        let result = multi_version_diff(
            &Image::new("one", temp.path().join("one")),
            &Image::new("two", temp.path().join("two")),
            &analyzer,
        )
        .unwrap();

        let delta = &result.diff.packages["express"];
        assert!(delta.added.contains_key("3.0"));
        assert!(delta.removed.contains_key("1.0"));
    }

    #[test]
    fn test_missing_inventory_is_not_found() {
        let temp = TempDir::new().unwrap();
        let analyzer = InventoryFileAnalyzer::new("Apt");
        let image = Image::new("ghost", temp.path().join("missing.json"));

        let err = SingleVersionAnalyzer::get_packages(&analyzer, &image).unwrap_err();
        assert!(matches!(err, AnalyzerError::NotFound(_)));
    }

    #[test]
    fn test_malformed_inventory_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let analyzer = InventoryFileAnalyzer::new("Apt");
        let err =
            MultiVersionAnalyzer::get_packages(&analyzer, &Image::new("bad", &path)).unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse(_)));
    }
}
