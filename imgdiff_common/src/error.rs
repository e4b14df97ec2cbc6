use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImgDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Comparison error: {0}")]
    Comparison(String),
}

pub type Result<T> = std::result::Result<T, ImgDiffError>;

/// Failure to obtain a package inventory from an image
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inventory not found: {0}")]
    NotFound(String),

    #[error("Failed to parse inventory: {0}")]
    Parse(String),

    #[error("Unsupported inventory: {0}")]
    Unsupported(String),
}
