use crate::set_diff;
use imgdiff_common::{
    AnalyzerError, Image, MultiVersionInventory, MultiVersionPackageAnalyzeResult,
    MultiVersionPackageDiff, MultiVersionPackageDiffResult, PackageChange,
    SingleVersionInventory, SingleVersionPackageAnalyzeResult, SingleVersionPackageDiff,
    SingleVersionPackageDiffResult, VersionDelta,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Extracts inventories where each package has at most one installed version
pub trait SingleVersionAnalyzer {
    /// Label written into diff and analysis results (e.g. "Apt")
    fn label(&self) -> &str;

    fn get_packages(&self, image: &Image) -> Result<SingleVersionInventory, AnalyzerError>;
}

/// Extracts inventories where several versions of a package may coexist
pub trait MultiVersionAnalyzer {
    fn label(&self) -> &str;

    fn get_packages(&self, image: &Image) -> Result<MultiVersionInventory, AnalyzerError>;
}

/// Diff two single-version inventories. Packages with identical info are omitted.
pub fn get_map_diff(
    old: &SingleVersionInventory,
    new: &SingleVersionInventory,
) -> SingleVersionPackageDiff {
    let mut diff = SingleVersionPackageDiff::default();

    for (name, info) in old {
        match new.get(name) {
            None => {
                diff.removed.insert(name.clone(), info.clone());
            }
            Some(after) if after != info => {
                diff.modified.insert(
                    name.clone(),
                    PackageChange {
                        before: info.clone(),
                        after: after.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    for (name, info) in new {
        if !old.contains_key(name) {
            diff.added.insert(name.clone(), info.clone());
        }
    }

    diff
}

/// Diff two multi-version inventories version by version.
///
/// A version present on both sides is never reported, even if its metadata
/// changed; packages without added or removed versions are omitted.
pub fn get_multi_version_map_diff(
    old: &MultiVersionInventory,
    new: &MultiVersionInventory,
) -> MultiVersionPackageDiff {
    let empty = BTreeMap::new();
    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut diff = MultiVersionPackageDiff::default();

    for name in names {
        let old_versions = old.get(name).unwrap_or(&empty);
        let new_versions = new.get(name).unwrap_or(&empty);
        let old_keys: Vec<&String> = old_versions.keys().collect();
        let new_keys: Vec<&String> = new_versions.keys().collect();

        let mut delta = VersionDelta::default();
        for version in set_diff::additions(&old_keys, &new_keys) {
            delta.added.insert(version.clone(), new_versions[version].clone());
        }
        for version in set_diff::deletions(&old_keys, &new_keys) {
            delta.removed.insert(version.clone(), old_versions[version].clone());
        }

        if !delta.is_empty() {
            diff.packages.insert(name.clone(), delta);
        }
    }

    diff
}

pub fn single_version_diff<A: SingleVersionAnalyzer + ?Sized>(
    image1: &Image,
    image2: &Image,
    analyzer: &A,
) -> Result<SingleVersionPackageDiffResult, AnalyzerError> {
    info!("Running {} diff on {} and {}", analyzer.label(), image1.source, image2.source);
    let packages1 = analyzer.get_packages(image1)?;
    let packages2 = analyzer.get_packages(image2)?;

    let diff = get_map_diff(&packages1, &packages2);
    debug!(
        "{} added, {} removed, {} modified packages",
        diff.added.len(),
        diff.removed.len(),
        diff.modified.len()
    );

    Ok(SingleVersionPackageDiffResult {
        image1: image1.source.clone(),
        image2: image2.source.clone(),
        diff_type: analyzer.label().to_string(),
        diff,
    })
}

pub fn multi_version_diff<A: MultiVersionAnalyzer + ?Sized>(
    image1: &Image,
    image2: &Image,
    analyzer: &A,
) -> Result<MultiVersionPackageDiffResult, AnalyzerError> {
    info!("Running {} diff on {} and {}", analyzer.label(), image1.source, image2.source);
    let packages1 = analyzer.get_packages(image1)?;
    let packages2 = analyzer.get_packages(image2)?;

    let diff = get_multi_version_map_diff(&packages1, &packages2);
    debug!("{} packages changed", diff.packages.len());

    Ok(MultiVersionPackageDiffResult {
        image1: image1.source.clone(),
        image2: image2.source.clone(),
        diff_type: analyzer.label().to_string(),
        diff,
    })
}

pub fn single_version_analysis<A: SingleVersionAnalyzer + ?Sized>(
    image: &Image,
    analyzer: &A,
) -> Result<SingleVersionPackageAnalyzeResult, AnalyzerError> {
    let analysis = analyzer.get_packages(image)?;
    Ok(SingleVersionPackageAnalyzeResult {
        image: image.source.clone(),
        analyze_type: analyzer.label().to_string(),
        analysis,
    })
}

pub fn multi_version_analysis<A: MultiVersionAnalyzer + ?Sized>(
    image: &Image,
    analyzer: &A,
) -> Result<MultiVersionPackageAnalyzeResult, AnalyzerError> {
    let analysis = analyzer.get_packages(image)?;
    Ok(MultiVersionPackageAnalyzeResult {
        image: image.source.clone(),
        analyze_type: analyzer.label().to_string(),
        analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgdiff_common::PackageInfo;
    use std::collections::HashMap;

    fn single(entries: &[(&str, &str, i64)]) -> SingleVersionInventory {
        entries
            .iter()
            .map(|(name, version, size)| (name.to_string(), PackageInfo::new(*version, *size)))
            .collect()
    }

    fn multi(entries: &[(&str, &[&str])]) -> MultiVersionInventory {
        entries
            .iter()
            .map(|(name, versions)| {
                let versions = versions
                    .iter()
                    .map(|v| (v.to_string(), PackageInfo::new(*v, 100)))
                    .collect();
                (name.to_string(), versions)
            })
            .collect()
    }

    struct FakeApt {
        inventories: HashMap<String, SingleVersionInventory>,
    }

    impl SingleVersionAnalyzer for FakeApt {
        fn label(&self) -> &str {
            "Apt"
        }

        fn get_packages(&self, image: &Image) -> Result<SingleVersionInventory, AnalyzerError> {
            self.inventories
                .get(&image.source)
                .cloned()
                .ok_or_else(|| AnalyzerError::NotFound(image.source.clone()))
        }
    }

    struct FakeNode {
        inventories: HashMap<String, MultiVersionInventory>,
    }

    impl MultiVersionAnalyzer for FakeNode {
        fn label(&self) -> &str {
            "Node"
        }

        fn get_packages(&self, image: &Image) -> Result<MultiVersionInventory, AnalyzerError> {
            self.inventories
                .get(&image.source)
                .cloned()
                .ok_or_else(|| AnalyzerError::NotFound(image.source.clone()))
        }
    }

    #[test]
    fn test_single_version_scenario() {
        let p1 = single(&[("curl", "7.1", 300)]);
        let p2 = single(&[("curl", "7.2", 300), ("wget", "1.0", 50)]);

        let diff = get_map_diff(&p1, &p2);

        assert_eq!(diff.added, single(&[("wget", "1.0", 50)]));
        assert!(diff.removed.is_empty());
        assert_eq!(diff.modified.len(), 1);
        let change = &diff.modified["curl"];
        assert_eq!(change.before.version, "7.1");
        assert_eq!(change.after.version, "7.2");
    }

    #[test]
    fn test_single_version_size_change_is_modified() {
        let p1 = single(&[("bash", "5.1", 1000)]);
        let p2 = single(&[("bash", "5.1", 1200)]);

        let diff = get_map_diff(&p1, &p2);
        assert_eq!(diff.modified["bash"].after.size, 1200);
    }

    #[test]
    fn test_single_version_identical_omitted() {
        let p = single(&[("zlib", "1.2", 10), ("tar", "1.34", 20)]);
        assert!(get_map_diff(&p, &p).is_empty());
    }

    #[test]
    fn test_single_version_removed() {
        let p1 = single(&[("vim", "9.0", 10), ("nano", "7.2", 5)]);
        let p2 = single(&[("nano", "7.2", 5)]);

        let diff = get_map_diff(&p1, &p2);
        assert_eq!(diff.removed, single(&[("vim", "9.0", 10)]));
        assert!(diff.added.is_empty());
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn test_multi_version_scenario() {
        let p1 = multi(&[("libfoo", &["v1", "v2"])]);
        let p2 = multi(&[("libfoo", &["v2", "v3"])]);

        let diff = get_multi_version_map_diff(&p1, &p2);
        let delta = &diff.packages["libfoo"];

        assert_eq!(delta.added.keys().collect::<Vec<_>>(), vec!["v3"]);
        assert_eq!(delta.removed.keys().collect::<Vec<_>>(), vec!["v1"]);
        assert!(!delta.added.contains_key("v2"));
        assert!(!delta.removed.contains_key("v2"));
    }

    #[test]
    fn test_multi_version_whole_package_added_and_removed() {
        let p1 = multi(&[("left-pad", &["1.0.0"]), ("shared", &["2.0"])]);
        let p2 = multi(&[("lodash", &["4.17.21", "3.10.1"]), ("shared", &["2.0"])]);

        let diff = get_multi_version_map_diff(&p1, &p2);

        assert_eq!(diff.packages.len(), 2);
        assert!(diff.packages["left-pad"].added.is_empty());
        assert_eq!(diff.packages["left-pad"].removed.len(), 1);
        assert_eq!(diff.packages["lodash"].added.len(), 2);
        assert!(!diff.packages.contains_key("shared"));
    }

    #[test]
    fn test_multi_version_union_of_names() {
        let p1 = multi(&[("bash", &["5.1"]), ("curl", &["7.1"]), ("zlib", &["1.2"])]);
        let p2 = multi(&[("bash", &["5.1"]), ("curl", &["7.1", "8.0"]), ("zlib", &["1.3"])]);

        let diff = get_multi_version_map_diff(&p1, &p2);

        let changed: Vec<&String> = diff.packages.keys().collect();
        assert_eq!(changed, vec!["curl", "zlib"]);
        assert_eq!(diff.packages["curl"].added.keys().collect::<Vec<_>>(), vec!["8.0"]);
        assert!(diff.packages["curl"].removed.is_empty());
        assert_eq!(diff.packages["zlib"].added.keys().collect::<Vec<_>>(), vec!["1.3"]);
        assert_eq!(diff.packages["zlib"].removed.keys().collect::<Vec<_>>(), vec!["1.2"]);
    }

    #[test]
    fn test_multi_version_metadata_change_not_reported() {
        let mut p1 = multi(&[("requests", &["2.31.0"])]);
        let p2 = multi(&[("requests", &["2.31.0"])]);
        p1.get_mut("requests").unwrap().get_mut("2.31.0").unwrap().size = 1;

        assert!(get_multi_version_map_diff(&p1, &p2).is_empty());
    }

    #[test]
    fn test_single_version_diff_labels_result() {
        let analyzer = FakeApt {
            inventories: HashMap::from([
                ("img:1".to_string(), single(&[("curl", "7.1", 1)])),
                ("img:2".to_string(), single(&[("curl", "7.2", 1)])),
            ]),
        };

        let result = single_version_diff(
            &Image::new("img:1", "/tmp/1"),
            &Image::new("img:2", "/tmp/2"),
            &analyzer,
        )
        .unwrap();

        assert_eq!(result.image1, "img:1");
        assert_eq!(result.image2, "img:2");
        assert_eq!(result.diff_type, "Apt");
        assert!(result.diff.modified.contains_key("curl"));
    }

    #[test]
    fn test_fetch_failure_aborts_with_error() {
        let analyzer = FakeApt {
            inventories: HashMap::from([("img:1".to_string(), single(&[("curl", "7.1", 1)]))]),
        };

        let result = single_version_diff(
            &Image::new("img:1", "/tmp/1"),
            &Image::new("missing", "/tmp/2"),
            &analyzer,
        );

        assert!(matches!(result, Err(AnalyzerError::NotFound(ref s)) if s == "missing"));
        assert_eq!(result.unwrap_or_default(), SingleVersionPackageDiffResult::default());
    }

    #[test]
    fn test_multi_version_diff_and_analysis() {
        let analyzer = FakeNode {
            inventories: HashMap::from([
                ("a".to_string(), multi(&[("libfoo", &["v1", "v2"])])),
                ("b".to_string(), multi(&[("libfoo", &["v2", "v3"])])),
            ]),
        };
        let a = Image::new("a", "/a");
        let b = Image::new("b", "/b");

        let diff = multi_version_diff(&a, &b, &analyzer).unwrap();
        assert_eq!(diff.diff_type, "Node");
        assert!(diff.diff.packages["libfoo"].added.contains_key("v3"));

        let analysis = multi_version_analysis(&a, &analyzer).unwrap();
        assert_eq!(analysis.image, "a");
        assert_eq!(analysis.analyze_type, "Node");
        assert_eq!(analysis.analysis["libfoo"].len(), 2);

        let missing = multi_version_analysis(&Image::new("c", "/c"), &analyzer);
        assert!(missing.is_err());
    }

    #[test]
    fn test_single_version_analysis_wraps_inventory() {
        let inventory = single(&[("musl", "1.2.4", 600)]);
        let analyzer = FakeApt {
            inventories: HashMap::from([("alpine".to_string(), inventory.clone())]),
        };

        let result = single_version_analysis(&Image::new("alpine", "/x"), &analyzer).unwrap();
        assert_eq!(result.analyze_type, "Apt");
        assert_eq!(result.analysis, inventory);
    }
}
