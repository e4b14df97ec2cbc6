use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::equality::{EntryVerdict, EqualityPolicy};
use crate::set_diff;
use crate::size::get_size;
use imgdiff_common::{
    entry_display_name, resolve_entry, AppConfig, DirDiff, Directory, DirectoryEntry, EntryDiff,
    ImgDiffError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Diff engine for filesystem snapshots
pub struct DirectoryDiffEngine {
    policy: EqualityPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for DirectoryDiffEngine {
    fn default() -> Self {
        Self::new(EqualityPolicy::default())
    }
}

impl DirectoryDiffEngine {
    pub fn new(policy: EqualityPolicy) -> Self {
        Self {
            policy,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(EqualityPolicy::from_config(config))
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn policy(&self) -> &EqualityPolicy {
        &self.policy
    }

    /// Diff two snapshots. The flag is true when nothing was added, deleted or modified.
    pub fn diff(&self, d1: &Directory, d2: &Directory) -> (DirDiff, bool) {
        log_diff_start(d1, d2);

        let adds = sorted(get_added_entries(d1, d2))
            .iter()
            .map(|entry| self.sized_entry(&d2.root, entry))
            .collect();
        let dels = sorted(get_deleted_entries(d1, d2))
            .iter()
            .map(|entry| self.sized_entry(&d1.root, entry))
            .collect();
        let mods = sorted(self.get_modified_entries(d1, d2))
            .iter()
            .map(|entry| self.entry_diff(d1, d2, entry))
            .collect();

        finish(DirDiff { adds, dels, mods })
    }

    /// Same as [`diff`](Self::diff), stopping between entries once `cancel` is set
    pub fn diff_with_cancel(
        &self,
        d1: &Directory,
        d2: &Directory,
        cancel: Option<&AtomicBool>,
    ) -> Result<(DirDiff, bool), ImgDiffError> {
        log_diff_start(d1, d2);

        let mut adds = Vec::new();
        for entry in sorted(get_added_entries(d1, d2)) {
            check_cancel(cancel)?;
            adds.push(self.sized_entry(&d2.root, &entry));
        }

        let mut dels = Vec::new();
        for entry in sorted(get_deleted_entries(d1, d2)) {
            check_cancel(cancel)?;
            dels.push(self.sized_entry(&d1.root, &entry));
        }

        let mut modified = Vec::new();
        for entry in set_diff::matches(&d1.content, &d2.content) {
            check_cancel(cancel)?;
            if self.is_modified(d1, d2, &entry) {
                modified.push(entry);
            }
        }

        let mut mods = Vec::new();
        for entry in sorted(modified) {
            check_cancel(cancel)?;
            mods.push(self.entry_diff(d1, d2, &entry));
        }

        Ok(finish(DirDiff { adds, dels, mods }))
    }

    /// Matched entries whose content differs. Entries that cannot be inspected are left out.
    pub fn get_modified_entries(&self, d1: &Directory, d2: &Directory) -> Vec<PathBuf> {
        set_diff::matches(&d1.content, &d2.content)
            .into_iter()
            .filter(|entry| self.is_modified(d1, d2, entry))
            .collect()
    }

    /// Every entry of `d` with its resolved size
    pub fn get_directory_entries(&self, d: &Directory) -> Vec<DirectoryEntry> {
        d.content
            .iter()
            .map(|entry| self.sized_entry(&d.root, entry))
            .collect()
    }

    fn is_modified(&self, d1: &Directory, d2: &Directory, entry: &Path) -> bool {
        match self.policy.classify(&d1.resolve(entry), &d2.resolve(entry)) {
            Ok(EntryVerdict::Modified) => true,
            Ok(EntryVerdict::Same) | Ok(EntryVerdict::Skipped) => false,
            Err(e) => {
                self.diagnostics.entry_skipped(&entry_display_name(entry), &e);
                false
            }
        }
    }

    fn sized_entry(&self, root: &Path, entry: &Path) -> DirectoryEntry {
        DirectoryEntry {
            name: entry_display_name(entry),
            size: get_size(&resolve_entry(root, entry), self.diagnostics.as_ref()),
        }
    }

    fn entry_diff(&self, d1: &Directory, d2: &Directory, entry: &Path) -> EntryDiff {
        EntryDiff {
            name: entry_display_name(entry),
            size1: get_size(&d1.resolve(entry), self.diagnostics.as_ref()),
            size2: get_size(&d2.resolve(entry), self.diagnostics.as_ref()),
        }
    }
}

/// Diff two snapshots with the default policy, logging through `tracing`
pub fn diff_directory(d1: &Directory, d2: &Directory) -> (DirDiff, bool) {
    DirectoryDiffEngine::default().diff(d1, d2)
}

pub fn get_added_entries(d1: &Directory, d2: &Directory) -> Vec<PathBuf> {
    set_diff::additions(&d1.content, &d2.content)
}

pub fn get_deleted_entries(d1: &Directory, d2: &Directory) -> Vec<PathBuf> {
    set_diff::deletions(&d1.content, &d2.content)
}

fn log_diff_start(d1: &Directory, d2: &Directory) {
    info!(
        "Diffing {} entries under {} with {} entries under {}",
        d1.content.len(),
        d1.root.display(),
        d2.content.len(),
        d2.root.display()
    );
}

fn finish(diff: DirDiff) -> (DirDiff, bool) {
    debug!(
        "{} added, {} deleted, {} modified",
        diff.adds.len(),
        diff.dels.len(),
        diff.mods.len()
    );
    let same = diff.is_empty();
    (diff, same)
}

/// Orders entries by their raw bytes
fn sorted(mut entries: Vec<PathBuf>) -> Vec<PathBuf> {
    entries.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    entries
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<(), ImgDiffError> {
    if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
        return Err(ImgDiffError::Comparison("Comparison cancelled".to_string()));
    }
    Ok(())
}
