pub mod diagnostics;
pub mod dir_diff;
pub mod equality;
pub mod file_diff;
pub mod inventory;
pub mod package_diff;
pub mod set_diff;
pub mod size;
pub mod snapshot;

pub use diagnostics::{DiagnosticEvent, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use dir_diff::{diff_directory, get_added_entries, get_deleted_entries, DirectoryDiffEngine};
pub use equality::{compare_files, ContentVerdict, EntryVerdict, EqualityPolicy};
pub use file_diff::FileAnalyzer;
pub use inventory::InventoryFileAnalyzer;
pub use package_diff::{
    get_map_diff, get_multi_version_map_diff, multi_version_analysis, multi_version_diff,
    single_version_analysis, single_version_diff, MultiVersionAnalyzer, SingleVersionAnalyzer,
};
pub use size::get_size;
pub use snapshot::SnapshotBuilder;
