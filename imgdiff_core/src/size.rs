use crate::diagnostics::Diagnostics;
use imgdiff_common::SIZE_UNKNOWN;
use jwalk::{Parallelism, WalkDir};
use std::fs;
use std::path::Path;

/// Resolve the on-disk size of `path`.
///
/// Directories report the sum of every non-directory descendant. Any stat
/// or walk failure is reported to `diagnostics` and yields [`SIZE_UNKNOWN`].
pub fn get_size(path: &Path, diagnostics: &dyn Diagnostics) -> i64 {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            diagnostics.size_unresolved(path, &e);
            return SIZE_UNKNOWN;
        }
    };

    if !metadata.is_dir() {
        return to_size(metadata.len());
    }

    match directory_size(path) {
        Ok(size) => size,
        Err(e) => {
            diagnostics.size_unresolved(path, &e);
            SIZE_UNKNOWN
        }
    }
}

fn directory_size(path: &Path) -> Result<i64, jwalk::Error> {
    let walker = WalkDir::new(path)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false);

    let mut size: i64 = 0;
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        size = size.saturating_add(to_size(entry.metadata()?.len()));
    }
    Ok(size)
}

fn to_size(len: u64) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
