//! Rules deciding whether two matched snapshot entries are the same.

use imgdiff_common::{default_archive_suffixes, AppConfig, ArchiveComparison};
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of classifying a matched entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryVerdict {
    Same,
    Modified,
    /// Both sides are directories; their descendants are compared individually
    Skipped,
}

/// Outcome of comparing two regular files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentVerdict {
    Identical,
    /// Sizes differ; content was not read
    SizeMismatch,
    ContentMismatch,
}

impl ContentVerdict {
    pub fn is_identical(self) -> bool {
        self == ContentVerdict::Identical
    }
}

#[derive(Debug, Clone)]
pub struct EqualityPolicy {
    archive_comparison: ArchiveComparison,
    archive_suffixes: Vec<String>,
}

impl Default for EqualityPolicy {
    fn default() -> Self {
        Self {
            archive_comparison: ArchiveComparison::SizeOnly,
            archive_suffixes: default_archive_suffixes(),
        }
    }
}

impl EqualityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            archive_comparison: config.archive_comparison,
            archive_suffixes: config
                .archive_suffixes
                .iter()
                .map(|suffix| suffix.to_lowercase())
                .collect(),
        }
    }

    pub fn with_archive_comparison(mut self, comparison: ArchiveComparison) -> Self {
        self.archive_comparison = comparison;
        self
    }

    pub fn archive_comparison(&self) -> ArchiveComparison {
        self.archive_comparison
    }

    /// Whether `path` names an archive, judged by filename suffix only
    pub fn is_archive(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => return false,
        };
        self.archive_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Classify the entry found at `left` in the old snapshot and `right` in the new one.
    ///
    /// Errors mean the entry could not be inspected and must be left out of the diff.
    pub fn classify(&self, left: &Path, right: &Path) -> io::Result<EntryVerdict> {
        let left_meta = fs::metadata(left)?;
        let right_meta = fs::metadata(right)?;

        match (left_meta.is_dir(), right_meta.is_dir()) {
            (true, true) => return Ok(EntryVerdict::Skipped),
            // A file replaced by a directory, or the reverse, is a change on either side
            (true, false) | (false, true) => return Ok(EntryVerdict::Modified),
            (false, false) => {}
        }

        if self.archive_comparison == ArchiveComparison::SizeOnly && self.is_archive(left) {
            return Ok(if left_meta.len() == right_meta.len() {
                EntryVerdict::Same
            } else {
                EntryVerdict::Modified
            });
        }

        let verdict = compare_with_metadata(left, right, &left_meta, &right_meta)?;
        Ok(if verdict.is_identical() {
            EntryVerdict::Same
        } else {
            EntryVerdict::Modified
        })
    }
}

/// Compare two regular files byte for byte, checking sizes first
pub fn compare_files(left: &Path, right: &Path) -> io::Result<ContentVerdict> {
    let left_meta = fs::metadata(left)?;
    let right_meta = fs::metadata(right)?;
    compare_with_metadata(left, right, &left_meta, &right_meta)
}

fn compare_with_metadata(
    left: &Path,
    right: &Path,
    left_meta: &Metadata,
    right_meta: &Metadata,
) -> io::Result<ContentVerdict> {
    if left_meta.len() != right_meta.len() {
        return Ok(ContentVerdict::SizeMismatch);
    }

    let mut left_file = File::open(left)?;
    let mut right_file = File::open(right)?;
    let mut left_buf = vec![0u8; CHUNK_SIZE];
    let mut right_buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = left_meta.len();

    while remaining > 0 {
        let n = CHUNK_SIZE.min(usize::try_from(remaining).unwrap_or(CHUNK_SIZE));
        left_file.read_exact(&mut left_buf[..n])?;
        right_file.read_exact(&mut right_buf[..n])?;
        if left_buf[..n] != right_buf[..n] {
            return Ok(ContentVerdict::ContentMismatch);
        }
        remaining -= n as u64;
    }

    Ok(ContentVerdict::Identical)
}
