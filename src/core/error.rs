use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Per-file parse and contract failures are not errors at
/// this level; they are collected as [`crate::core::objective::FileError`].
#[derive(Error, Debug)]
pub enum LintError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("I/O error reading {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Path error: {0}")]
    PathError(String),
    #[error("Output error: {0}")]
    OutputError(#[from] serde_json::Error),
    #[error("Worker pool error: {0}")]
    PoolError(#[from] rayon::ThreadPoolBuildError),
    #[error("Validation failed for {0} files.")]
    ValidationFailed(usize),
}
