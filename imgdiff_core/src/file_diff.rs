use crate::dir_diff::DirectoryDiffEngine;
use crate::snapshot::SnapshotBuilder;
use imgdiff_common::{AppConfig, DirDiffResult, FileAnalyzeResult, Image, ImgDiffError};
use tracing::info;

const FILE_LABEL: &str = "File";

/// Diffs the extracted filesystems of two images
pub struct FileAnalyzer {
    builder: SnapshotBuilder,
    engine: DirectoryDiffEngine,
}

impl FileAnalyzer {
    pub fn new(config: AppConfig) -> Self {
        let engine = DirectoryDiffEngine::from_config(&config);
        Self {
            builder: SnapshotBuilder::new(config),
            engine,
        }
    }

    pub fn with_engine(mut self, engine: DirectoryDiffEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn label(&self) -> &str {
        FILE_LABEL
    }

    pub fn diff(&self, image1: &Image, image2: &Image) -> Result<DirDiffResult, ImgDiffError> {
        info!("Running file diff on {} and {}", image1.source, image2.source);
        let d1 = self.builder.directory(&image1.fs_path, true)?;
        let d2 = self.builder.directory(&image2.fs_path, true)?;
        let (diff, _) = self.engine.diff(&d1, &d2);

        Ok(DirDiffResult {
            image1: image1.source.clone(),
            image2: image2.source.clone(),
            diff_type: FILE_LABEL.to_string(),
            diff,
        })
    }

    pub fn analyze(&self, image: &Image) -> Result<FileAnalyzeResult, ImgDiffError> {
        let directory = self.builder.directory(&image.fs_path, true)?;
        Ok(FileAnalyzeResult {
            image: image.source.clone(),
            analyze_type: FILE_LABEL.to_string(),
            analysis: self.engine.get_directory_entries(&directory),
        })
    }
}
